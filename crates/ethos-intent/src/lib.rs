//! Intent engine for Ethos.
//!
//! Turns an utterance into an [`Intent`] plus slots, resolves free-text time
//! expressions, and runs the background loop that fires due reminders.
//!
//! ## Modules
//!
//! - [`time`] -- natural-language time expressions to local timestamps.
//! - [`slots`] -- tag annotation and task text extraction.
//! - [`router`] -- ordered pattern routes, first match wins.
//! - [`fallback`] -- asks the language model for a time phrase when the
//!   rule-based extractor finds none.
//! - [`scheduler`] -- the polling trigger loop.
//! - [`error`] -- intent engine error types.

pub mod error;
pub mod fallback;
pub mod router;
pub mod scheduler;
pub mod slots;
pub mod time;

pub use error::{IntentError, Result};
pub use fallback::{extract_time_phrase, resolve_time_via_model};
pub use router::{Intent, IntentRouter, RoutedUtterance};
pub use scheduler::ReminderScheduler;
pub use time::{TimeMatch, TimeResolver};
