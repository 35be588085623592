//! Conversation memory: an append-only log of user/assistant exchanges.
//!
//! Stored next to the reminders as a JSON array and loaded with the same
//! corrupt-tolerant policy.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::StoreResult;
use crate::file::{read_records, write_atomic};

/// One remembered exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// The remembered text, e.g. `"USER: ...\nETHOS: ..."`.
    pub content: String,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata supplied by the caller.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Persistent interaction log.
#[derive(Debug)]
pub struct InteractionLog {
    path: PathBuf,
    entries: Mutex<Vec<Interaction>>,
}

impl InteractionLog {
    /// Open the log backed by `path`; a missing or corrupt file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries: Vec<Interaction> = read_records(&path);
        debug!(path = %path.display(), count = entries.len(), "interaction log loaded");
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry and persist the log.
    #[instrument(skip(self, content, metadata))]
    pub fn record(&self, content: impl Into<String>, metadata: Map<String, Value>) -> StoreResult<()> {
        let mut entries = self.lock();
        entries.push(Interaction {
            content: content.into(),
            timestamp: Utc::now(),
            metadata,
        });
        if let Err(e) = write_atomic(&self.path, &*entries) {
            entries.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Case-insensitive substring search over entry content.
    pub fn search(&self, query: &str) -> Vec<Interaction> {
        let needle = query.to_lowercase();
        self.lock()
            .iter()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Every entry, oldest first.
    pub fn all(&self) -> Vec<Interaction> {
        self.lock().clone()
    }

    /// Drop every entry and persist the empty log.
    pub fn clear(&self) -> StoreResult<()> {
        let mut entries = self.lock();
        entries.clear();
        write_atomic(&self.path, &*entries)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Interaction>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
