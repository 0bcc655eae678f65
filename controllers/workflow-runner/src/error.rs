//! Runner error types.
//!
//! Configuration and playbook problems; workflow failures are reported in
//! the outcome report instead.

use controller_client::ApiError;
use thiserror::Error;

/// Errors that stop the runner before or around a workflow run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Missing or malformed environment configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Playbook file could not be read
    #[error("Failed to read playbook {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Playbook is not valid YAML or does not match the workflow schema
    #[error("Invalid playbook: {0}")]
    Playbook(String),

    /// Login or release lookup failed
    #[error("Controller error: {0}")]
    Controller(#[from] ApiError),
}

impl From<serde_yaml::Error> for RunnerError {
    fn from(e: serde_yaml::Error) -> Self {
        RunnerError::Playbook(e.to_string())
    }
}
