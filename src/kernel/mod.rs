pub mod epoch;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod machine;
pub mod session;
pub mod time;
