//! Agent error types.
//!
//! Every failure talking to the model surfaces as an [`AgentError`].  The
//! assistant never treats these as fatal: callers log them and fall back to
//! a canned reply.

/// Unified error type for the language-model collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The HTTP request could not be sent or returned a non-success status.
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// A response body could not be parsed.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The streamed body was interrupted or was not valid UTF-8.
    #[error("llm stream error: {reason}")]
    LlmStreamError { reason: String },

    /// The server reported an error inside the stream.
    #[error("llm server error: {message}")]
    Server { message: String },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}
