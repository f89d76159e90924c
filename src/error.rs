//! Error types for tracklog
//!
//! Name collisions and unparsable suffixes are not errors: they surface as
//! [`crate::naming::NameDiagnostic`] values. Only collaborator failures and
//! caller mistakes end up here.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// tracklog error types
#[derive(Error, Debug)]
pub enum Error {
    /// The tracking service rejected or failed a call (network, auth, server side)
    #[error("Tracking service error: {0}")]
    Collaborator(String),

    /// No task with the given ID is known to the tracking service
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A configuration path did not resolve to a value
    #[error("Missing config key: {path}")]
    MissingKey {
        /// Dotted path that was looked up
        path: String,
    },

    /// Invalid argument supplied by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::MissingKey`] for the given dotted path.
    #[must_use]
    pub fn missing_key(path: impl Into<String>) -> Self {
        Self::MissingKey { path: path.into() }
    }
}
