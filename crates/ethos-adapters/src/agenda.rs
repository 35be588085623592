//! Daily agenda: today's weather plus today's pending reminders.
//!
//! Each section degrades on its own.  A weather failure shows a placeholder
//! and the reminders are still listed.

use chrono::NaiveDate;
use ethos_store::Reminder;
use tracing::{info, warn};

use crate::traits::WeatherSource;
use crate::weather::DailyForecast;

const WEATHER_UNAVAILABLE: &str = "Weather unavailable right now.";

/// A composed agenda for one day.
#[derive(Debug, Clone)]
pub struct Agenda {
    pub date: NaiveDate,
    /// `None` when the weather source failed.
    pub forecast: Option<DailyForecast>,
    /// Pending reminders for `date`, in creation order.
    pub reminders: Vec<Reminder>,
}

/// Gather the agenda for `date`.
///
/// Never fails: an unavailable weather source is logged and recorded as a
/// missing forecast.
pub async fn compose_agenda(
    weather: &dyn WeatherSource,
    reminders: Vec<Reminder>,
    date: NaiveDate,
) -> Agenda {
    info!(date = %date, reminders = reminders.len(), "composing agenda");

    let forecast = match weather.today().await {
        Ok(f) => Some(f),
        Err(e) => {
            warn!(error = %e, "weather fetch failed, showing placeholder");
            None
        }
    };

    Agenda {
        date,
        forecast,
        reminders,
    }
}

impl Agenda {
    /// Console rendering.
    pub fn render(&self) -> String {
        let mut out = format!(
            "\u{23f0} Here's your agenda for {}:\n\n",
            self.date.format("%A, %B %-d")
        );

        match &self.forecast {
            Some(f) => out.push_str(&f.render()),
            None => out.push_str(WEATHER_UNAVAILABLE),
        }
        out.push_str("\n\n");

        if self.reminders.is_empty() {
            out.push_str("\u{2705} No scheduled reminders for today.");
        } else {
            out.push_str("\u{1f4cc} Today's Reminders:");
            for r in &self.reminders {
                out.push_str(&format!("\n \u{2022} {} at {}", r.task, r.time.format("%-I:%M %p")));
            }
        }
        out
    }

    /// Short spoken summary.
    pub fn spoken(&self) -> String {
        let weather = match &self.forecast {
            Some(f) => f.spoken(),
            None => WEATHER_UNAVAILABLE.to_owned(),
        };
        let reminders = match self.reminders.len() {
            0 => "You have no scheduled reminders for today.".to_owned(),
            1 => "You have 1 reminder today.".to_owned(),
            n => format!("You have {n} reminders today."),
        };
        format!("Here is your agenda for today. {weather} {reminders}")
    }
}
