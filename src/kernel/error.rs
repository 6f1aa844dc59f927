use thiserror::Error;

use super::session::JobState;

/// Local precondition failures. These are raised before anything reaches the
/// transport.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("cannot {op} while session is {state:?}")]
    InvalidState { op: &'static str, state: JobState },

    #[error("session is not ready for search")]
    NotReady,

    #[error("query needs at least {min} non-whitespace characters")]
    InvalidQuery { min: usize },

    #[error("session has no job id")]
    MissingJobId,

    #[error("settings are locked once a job has been submitted")]
    SettingsLocked,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
