// Error types for unitwatch

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using anyhow::Error
pub type Result<T> = anyhow::Result<T>;

/// Coordinator-level errors. Only these change the process exit status.
#[derive(Error, Debug)]
pub enum UnitwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to acquire run lock {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to obtain a status snapshot for one unit.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Unit '{unit}' is user-scoped but no owning user is configured")]
    MissingOwner { unit: String },

    #[error("Failed to query status of '{unit}': {message}")]
    Query { unit: String, message: String },

    #[error("Supervisor reported no {property} for '{unit}'")]
    MissingProperty { unit: String, property: &'static str },
}

impl ProbeError {
    /// True when the failure comes from local configuration rather than the supervisor
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProbeError::MissingOwner { .. })
    }
}

/// Failure to deliver one notification. Always logged and swallowed.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification rejected (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

/// Failure to read or write a persisted unit record.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("State file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode state for {path:?}: {message}")]
    Encode { path: PathBuf, message: String },
}
