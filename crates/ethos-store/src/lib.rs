//! # ethos-store
//!
//! Durable state for the Ethos assistant.
//!
//! The only persisted entity is the [`Reminder`].  A [`ReminderStore`] owns
//! the in-memory collection behind a single mutex and rewrites the backing
//! JSON file after every mutation.  A missing or corrupt file loads as an
//! empty collection so the assistant always starts; a single malformed
//! record is skipped without losing its neighbours.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  ReminderStore (Mutex<Vec<Reminder>>)    │
//! │  InteractionLog (Mutex<Vec<Interaction>>)│
//! ├──────────────────────────────────────────┤
//! │  file: read_records / write_atomic       │
//! │  (serde_json + tempfile rename)          │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use ethos_store::{ReminderStore, ReminderView};
//!
//! let store = ReminderStore::open("data/reminders.json");
//! store.add("call Sam", when, None)?;
//! for (i, r) in store.list(ReminderView::Pending).iter().enumerate() {
//!     println!("{}. {}", i + 1, r.task);
//! }
//! ```

pub mod error;
mod file;
pub mod memory;
pub mod reminder;
pub mod store;

// ── re-exports ───────────────────────────────────────────────────────

pub use error::{StoreError, StoreResult};
pub use memory::{Interaction, InteractionLog};
pub use reminder::{DEFAULT_TAG, Reminder, ReminderView, timestamp};
pub use store::ReminderStore;
