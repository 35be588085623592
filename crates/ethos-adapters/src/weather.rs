//! Daily forecast from the Open-Meteo API and clothing advice.
//!
//! Open-Meteo needs no API key.  A single-day forecast is requested with the
//! `daily` aggregates the agenda uses:
//!
//! ```text
//! GET /v1/forecast?latitude=41.27&longitude=-72.97
//!     &daily=temperature_2m_max,precipitation_sum,wind_speed_10m_max,weather_code
//!     &timezone=auto&forecast_days=1
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AdapterError, Result};
use crate::traits::WeatherSource;

/// Default Open-Meteo base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

const DAILY_FIELDS: &str = "temperature_2m_max,precipitation_sum,wind_speed_10m_max,weather_code";

/// Rain at or above this amount earns an umbrella note.
const UMBRELLA_THRESHOLD_MM: f64 = 1.0;

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

/// Today's aggregate weather.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    /// Forecast day, in the location's timezone.
    pub date: NaiveDate,
    /// Maximum temperature in degrees Celsius.
    pub max_temp_c: f64,
    /// Total precipitation in millimetres.
    pub precipitation_mm: f64,
    /// Maximum wind speed in km/h.
    pub max_wind_kph: f64,
    /// WMO weather interpretation code, when reported.
    pub weather_code: Option<u32>,
}

impl DailyForecast {
    /// Maximum temperature in degrees Fahrenheit, rounded to one decimal.
    pub fn max_temp_f(&self) -> f64 {
        celsius_to_fahrenheit(self.max_temp_c)
    }

    /// Short description of the WMO weather code.
    pub fn conditions(&self) -> &'static str {
        match self.weather_code {
            Some(0) => "clear sky",
            Some(1..=3) => "partly cloudy",
            Some(45 | 48) => "fog",
            Some(51..=57) => "drizzle",
            Some(61..=67) => "rain",
            Some(71..=77) => "snow",
            Some(80..=82) => "rain showers",
            Some(85 | 86) => "snow showers",
            Some(95..=99) => "thunderstorms",
            _ => "unknown conditions",
        }
    }

    /// Clothing advice for this forecast.
    pub fn suggestion(&self) -> String {
        clothing_recommendation(self.max_temp_f(), self.precipitation_mm, self.max_wind_kph)
    }

    /// Multi-line console rendering.
    pub fn render(&self) -> String {
        format!(
            "\u{1f321}\u{fe0f} High: {:.1}\u{b0}F ({})\n\
             \u{1f327}\u{fe0f} Rain: {} mm\n\
             \u{1f32c}\u{fe0f} Wind: {} km/h\n\
             \u{1f9e5} Suggestion: {}",
            self.max_temp_f(),
            self.conditions(),
            self.precipitation_mm,
            self.max_wind_kph,
            self.suggestion(),
        )
    }

    /// One-sentence spoken summary.
    pub fn spoken(&self) -> String {
        format!(
            "The high will be {:.0} degrees Fahrenheit with {}. {}",
            self.max_temp_f(),
            self.conditions(),
            self.suggestion()
        )
    }
}

/// Convert Celsius to Fahrenheit, rounded to one decimal.
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    ((c * 9.0 / 5.0 + 32.0) * 10.0).round() / 10.0
}

/// What to wear for the given high temperature (°F), rain (mm) and wind
/// (km/h).
pub fn clothing_recommendation(temp_f: f64, rain_mm: f64, wind_kph: f64) -> String {
    let base = if temp_f < 50.0 {
        "Wear a coat and scarf."
    } else if temp_f < 65.0 {
        "Light jacket recommended."
    } else if temp_f > 85.0 {
        "It's hot, so dress cool and stay hydrated."
    } else {
        "T-shirt and pants or a light dress should be fine."
    };

    let mut advice = base.to_owned();
    if rain_mm >= UMBRELLA_THRESHOLD_MM {
        advice.push_str(" Bring an umbrella.");
    }
    if wind_kph >= 40.0 {
        advice.push_str(" It will be windy.");
    }
    advice
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<NaiveDate>,
    temperature_2m_max: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<u32>>,
}

/// Extract the first day from an Open-Meteo forecast body.
pub fn parse_forecast(body: &serde_json::Value) -> Result<DailyForecast> {
    let resp: ForecastResponse =
        serde_json::from_value(body.clone()).map_err(|e| AdapterError::InvalidResponse {
            reason: format!("malformed forecast: {e}"),
        })?;
    let daily = resp.daily;

    let date = daily
        .time
        .first()
        .copied()
        .ok_or_else(|| AdapterError::InvalidResponse {
            reason: "forecast has no days".into(),
        })?;

    Ok(DailyForecast {
        date,
        max_temp_c: first(&daily.temperature_2m_max, "temperature_2m_max")?,
        precipitation_mm: first(&daily.precipitation_sum, "precipitation_sum").unwrap_or(0.0),
        max_wind_kph: first(&daily.wind_speed_10m_max, "wind_speed_10m_max").unwrap_or(0.0),
        weather_code: daily.weather_code.first().copied().flatten(),
    })
}

fn first(series: &[Option<f64>], name: &str) -> Result<f64> {
    series
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| AdapterError::InvalidResponse {
            reason: format!("forecast has no `{name}` value"),
        })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Where and how to fetch the forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            latitude: 41.27,
            longitude: -72.97,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// [`WeatherSource`] backed by the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    config: WeatherConfig,
    http: reqwest::Client,
}

impl OpenMeteoClient {
    /// Create a client for the configured location.
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// The configured location and endpoint.
    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn today(&self) -> Result<DailyForecast> {
        let url = format!("{}/v1/forecast", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, lat = self.config.latitude, lon = self.config.longitude, "fetching forecast");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("latitude", self.config.latitude.to_string()),
                ("longitude", self.config.longitude.to_string()),
                ("daily", DAILY_FIELDS.to_owned()),
                ("timezone", "auto".to_owned()),
                ("forecast_days", "1".to_owned()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AdapterError::RequestFailed {
                reason: format!("forecast API returned {status}: {text}"),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        let forecast = parse_forecast(&body)?;
        info!(date = %forecast.date, max_c = forecast.max_temp_c, "forecast fetched");
        Ok(forecast)
    }
}
