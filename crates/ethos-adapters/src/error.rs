//! Adapter error types.
//!
//! Collaborator failures are never fatal to the assistant.  Callers log an
//! [`AdapterError`] and substitute a placeholder.

/// Unified error type for Ethos adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An HTTP request failed or returned a non-success status.
    #[error("http request failed: {reason}")]
    RequestFailed { reason: String },

    /// A response body did not have the expected shape.
    #[error("unexpected response: {reason}")]
    InvalidResponse { reason: String },

    /// An external command could not be run or exited unsuccessfully.
    #[error("command `{program}` failed: {reason}")]
    CommandFailed { program: String, reason: String },

    /// An operation exceeded its time limit.
    #[error("timeout after {seconds}s: {reason}")]
    Timeout { seconds: u64, reason: String },

    /// Configuration error in adapter setup.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed {
            reason: err.to_string(),
        }
    }
}
