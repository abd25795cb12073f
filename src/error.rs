//! Error types for Orbit
//!
//! Provider failures are absorbed by the aggregator and only ever logged.
//! Action failures are the one class that reaches the user.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors a provider can report for a single query.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider did not answer within its time budget
    #[error("provider '{provider}' timed out after {after:?}")]
    Timeout { provider: String, after: Duration },

    /// The provider failed while producing candidates
    #[error("provider '{provider}' failed: {message}")]
    Failed { provider: String, message: String },

    /// The query was superseded while the provider was running
    #[error("query cancelled")]
    Cancelled,

    /// IO errors raised inside a provider
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn failed(provider: &str, message: impl Into<String>) -> Self {
        ProviderError::Failed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while executing an activated candidate's action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Launch or shell action with nothing to run
    #[error("Nothing to run: the command is empty")]
    EmptyCommand,

    /// The target path no longer exists
    #[error("{} does not exist", .0.display())]
    MissingPath(PathBuf),

    /// The helper program could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper program ran but reported failure
    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: String },

    /// Clipboard operation errors
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// The action cannot be performed on this platform
    #[error("Not supported: {0}")]
    Unsupported(String),
}

/// Crate-level errors
#[derive(Debug, Error)]
pub enum OrbitError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON errors (usage data, CLI output)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Orbit operations
pub type OrbitResult<T> = Result<T, OrbitError>;

/// Result type alias for provider searches
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for action execution
pub type ActionResult<T> = Result<T, ActionError>;
