//! Intent engine error types.
//!
//! Unresolved time is not an error anywhere in this crate; it is `None`.

/// Unified error type for the intent engine.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    /// A route pattern failed to compile.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// `start` was called on a scheduler whose loop is already running.
    #[error("reminder scheduler is already running")]
    SchedulerRunning,
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
