//! Runtime configuration.
//!
//! Read from an optional TOML file (`--config`, else `config/ethos.toml` when
//! it exists) and then overridden by `ETHOS_*` environment variables.  Every
//! field has a default, so an empty or absent file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ethos_adapters::{SpeechConfig, WeatherConfig};
use ethos_agent::OllamaConfig;
use serde::Deserialize;
use tracing::{info, warn};

use crate::helpers::env_non_empty;

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/ethos.toml";

const REMINDERS_FILE: &str = "reminders.json";
const MEMORY_FILE: &str = "memory_store.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EthosConfig {
    /// Directory holding the reminder file and the interaction log.
    pub data_dir: PathBuf,
    pub llm: LlmSection,
    pub speech: SpeechSection,
    pub weather: WeatherSection,
    pub scheduler: SchedulerSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Token cap for conversational answers.
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpeechSection {
    /// Text-to-speech command line; the spoken text is appended.
    pub command: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherSection {
    pub latitude: f64,
    pub longitude: f64,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub poll_interval_secs: u64,
}

impl Default for EthosConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            llm: LlmSection::default(),
            speech: SpeechSection::default(),
            weather: WeatherSection::default(),
            scheduler: SchedulerSection::default(),
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: ethos_agent::llm::client::DEFAULT_BASE_URL.to_owned(),
            model: ethos_agent::llm::client::DEFAULT_MODEL.to_owned(),
            timeout_secs: 120,
            max_tokens: ethos_agent::llm::types::DEFAULT_MAX_TOKENS,
        }
    }
}

impl Default for SpeechSection {
    fn default() -> Self {
        let speech = SpeechConfig::default();
        Self {
            command: speech.program,
            timeout_secs: speech.timeout.as_secs(),
        }
    }
}

impl Default for WeatherSection {
    fn default() -> Self {
        let weather = WeatherConfig::default();
        Self {
            latitude: weather.latitude,
            longitude: weather.longitude,
            base_url: weather.base_url,
            timeout_secs: weather.timeout.as_secs(),
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
        }
    }
}

impl EthosConfig {
    /// Load the configuration file and apply environment overrides.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(env_non_empty);
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `ETHOS_*` overrides read through `lookup`.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ETHOS_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ETHOS_OLLAMA_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("ETHOS_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("ETHOS_TTS_COMMAND") {
            self.speech.command = v;
        }
        if let Some(v) = parsed(&lookup, "ETHOS_LATITUDE") {
            self.weather.latitude = v;
        }
        if let Some(v) = parsed(&lookup, "ETHOS_LONGITUDE") {
            self.weather.longitude = v;
        }
        if let Some(v) = parsed(&lookup, "ETHOS_POLL_INTERVAL_SECS") {
            self.scheduler.poll_interval_secs = v;
        }
    }

    pub fn reminders_path(&self) -> PathBuf {
        self.data_dir.join(REMINDERS_FILE)
    }

    pub fn memory_path(&self) -> PathBuf {
        self.data_dir.join(MEMORY_FILE)
    }

    pub fn ollama(&self) -> OllamaConfig {
        OllamaConfig::new(&self.llm.base_url, &self.llm.model)
            .with_timeout(Duration::from_secs(self.llm.timeout_secs))
    }

    /// `None` when the speech command is blank.
    pub fn speech(&self) -> Option<SpeechConfig> {
        SpeechConfig::from_command_line(&self.speech.command)
            .map(|c| c.with_timeout(Duration::from_secs(self.speech.timeout_secs)))
    }

    pub fn weather(&self) -> WeatherConfig {
        WeatherConfig {
            latitude: self.weather.latitude,
            longitude: self.weather.longitude,
            base_url: self.weather.base_url.clone(),
            timeout: Duration::from_secs(self.weather.timeout_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.poll_interval_secs)
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
