//! Side-effecting collaborators for the Ethos assistant.
//!
//! The reminder core never talks to a speaker, a terminal or a weather
//! service directly.  It goes through the narrow traits defined here:
//!
//! - [`Notifier`] -- delivers a line of text to the user (console, speech,
//!   or both via [`FanoutNotifier`]).
//! - [`WeatherSource`] -- supplies today's forecast ([`OpenMeteoClient`]).
//!
//! [`agenda`] composes the daily agenda from a weather source and the
//! pending reminders of the day.

pub mod agenda;
pub mod error;
pub mod notify;
pub mod traits;
pub mod weather;

pub use agenda::{Agenda, compose_agenda};
pub use error::{AdapterError, Result};
pub use notify::{ConsoleNotifier, FanoutNotifier, SpeechConfig, SpeechNotifier};
pub use traits::{Notifier, WeatherSource};
pub use weather::{DailyForecast, OpenMeteoClient, WeatherConfig, clothing_recommendation};
