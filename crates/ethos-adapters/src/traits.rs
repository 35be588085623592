//! Collaborator traits.
//!
//! Both traits are object safe and used behind `Arc<dyn ...>` so the binary
//! can wire real implementations and tests can substitute recording mocks.

use async_trait::async_trait;

use crate::error::Result;
use crate::weather::DailyForecast;

/// Delivers a line of text to the user.
///
/// Implementations swallow and log their own failures: the caller fires and
/// forgets.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`.
    async fn notify(&self, text: &str);
}

/// Supplies today's weather forecast.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch the forecast for the current local day.
    async fn today(&self) -> Result<DailyForecast>;
}
