//! Mutex-protected reminder collection with write-through persistence.
//!
//! Every operation takes the same lock, so the interactive loop and the
//! trigger loop never observe each other's half-applied changes.  Mutations
//! rewrite the whole backing file before the lock is released; nothing
//! holds the lock while notifying the user.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, error, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::file::{read_records, write_atomic};
use crate::reminder::{Reminder, ReminderView};

/// Durable, ordered collection of reminders.
///
/// Construct once at startup and share via `Arc` between the interactive
/// loop and the background trigger loop.
#[derive(Debug)]
pub struct ReminderStore {
    path: PathBuf,
    reminders: Mutex<Vec<Reminder>>,
}

impl ReminderStore {
    /// Open the store backed by `path`.
    ///
    /// Never fails: a missing or unparseable file yields an empty store, and
    /// the file is (re)created on the first mutation.  Individual records
    /// that do not decode are dropped and the rest are kept.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let reminders: Vec<Reminder> = read_records(&path);
        info!(path = %path.display(), count = reminders.len(), "reminder store loaded");
        Self {
            path,
            reminders: Mutex::new(reminders),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new untriggered reminder and persist.
    ///
    /// `time` is already a resolved timestamp; callers that could not
    /// resolve one never reach the store.  The in-memory append is rolled
    /// back if the file cannot be written.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn add(&self, task: &str, time: DateTime<Local>, tag: Option<&str>) -> StoreResult<Reminder> {
        let task = task.trim();
        if task.is_empty() {
            return Err(StoreError::EmptyTask);
        }

        let reminder = Reminder::new(task, time, tag, Local::now());

        let mut reminders = self.lock();
        reminders.push(reminder.clone());
        if let Err(e) = write_atomic(&self.path, &*reminders) {
            reminders.pop();
            error!(error = %e, "failed to persist new reminder");
            return Err(e);
        }

        info!(task = %reminder.task, time = %reminder.time, tag = %reminder.tag, "reminder added");
        Ok(reminder)
    }

    /// Snapshot of the reminders visible in `view`, in creation order.
    pub fn list(&self, view: ReminderView) -> Vec<Reminder> {
        self.lock().iter().filter(|r| view.includes(r)).cloned().collect()
    }

    /// Remove the reminder at zero-based `index` within `view` and persist.
    ///
    /// The index is resolved against the same filter that [`list`](Self::list)
    /// applies, so a number shown to the user deletes the record they saw.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn delete(&self, index: usize, view: ReminderView) -> StoreResult<Reminder> {
        let mut reminders = self.lock();

        let visible: Vec<usize> = reminders
            .iter()
            .enumerate()
            .filter(|(_, r)| view.includes(r))
            .map(|(pos, _)| pos)
            .collect();

        let Some(&pos) = visible.get(index) else {
            return Err(StoreError::InvalidIndex {
                index,
                len: visible.len(),
            });
        };

        let removed = reminders.remove(pos);
        if let Err(e) = write_atomic(&self.path, &*reminders) {
            reminders.insert(pos, removed);
            error!(error = %e, "failed to persist reminder deletion");
            return Err(e);
        }

        info!(task = %removed.task, "reminder deleted");
        Ok(removed)
    }

    /// Atomically flip every due, untriggered reminder to triggered and
    /// return them.
    ///
    /// Each reminder is returned by exactly one call.  The flip is kept in
    /// memory even if persisting fails, so a reminder never fires twice
    /// within one process lifetime.
    pub fn mark_and_collect_due(&self, now: DateTime<Local>) -> Vec<Reminder> {
        let mut reminders = self.lock();

        let mut due = Vec::new();
        for reminder in reminders.iter_mut().filter(|r| r.is_due(now)) {
            reminder.triggered = true;
            due.push(reminder.clone());
        }

        if due.is_empty() {
            return due;
        }

        if let Err(e) = write_atomic(&self.path, &*reminders) {
            error!(error = %e, count = due.len(), "failed to persist triggered reminders");
        } else {
            debug!(count = due.len(), "triggered reminders persisted");
        }
        due
    }

    /// Pending reminders falling on the given local day, in creation order.
    pub fn pending_on(&self, date: NaiveDate) -> Vec<Reminder> {
        self.lock()
            .iter()
            .filter(|r| !r.triggered && r.is_on(date))
            .cloned()
            .collect()
    }

    /// Total number of stored reminders, triggered or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no reminders at all.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reminder>> {
        // The collection is always left consistent before any fallible call,
        // so a poisoned lock still guards valid data.
        self.reminders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
