//! Error types for the ethos-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Read failures never surface here: they degrade to an empty collection.

use std::path::PathBuf;

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the reminder store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing the backing file failed.
    #[error("io error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A reminder was submitted without a task description.
    #[error("reminder task must not be empty")]
    EmptyTask,

    /// A list index does not refer to a reminder in the requested view.
    #[error("reminder index {index} out of range ({len} in view)")]
    InvalidIndex { index: usize, len: usize },
}
