pub mod config;
pub mod kernel;
pub mod poller;
pub mod search;
pub mod services;
pub mod view;

// Re-export the pieces a front end needs
pub use config::{AudioSettings, ClientConfig, ModelSize};
pub use kernel::lifecycle::SessionManager;
pub use kernel::session::{JobMode, JobState, SearchState, Session};
pub use services::backend::{Asset, HttpTransport, Transport};
