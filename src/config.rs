use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::system::history::DEFAULT_CAPACITY;
use crate::system::process::SortKey;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sampler: SamplerConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// System summary and history cadence.
    pub summary_interval_ms: u64,
    /// Process snapshot cadence, rounded up to a multiple of the summary cadence.
    pub process_interval_ms: u64,
    pub history_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            summary_interval_ms: 1000,
            process_interval_ms: 2000,
            history_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl SamplerConfig {
    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms)
    }

    /// How many summary ticks pass between process snapshot rebuilds.
    pub fn process_every(&self) -> u64 {
        let summary = self.summary_interval_ms.max(1);
        self.process_interval_ms.div_ceil(summary).max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub default_sort: String,
    pub top: usize,
    pub output: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            default_sort: "cpu".to_string(),
            top: 15,
            output: "text".to_string(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sampler.{0} must be greater than 0")]
    Zero(&'static str),

    #[error("display.output must be \"text\" or \"json\", got {0:?}")]
    Output(String),

    #[error("display.default_sort must be \"cpu\" or \"memory\", got {0:?}")]
    Sort(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampler.summary_interval_ms == 0 {
            return Err(ConfigError::Zero("summary_interval_ms"));
        }
        if self.sampler.process_interval_ms == 0 {
            return Err(ConfigError::Zero("process_interval_ms"));
        }
        if self.sampler.history_capacity == 0 {
            return Err(ConfigError::Zero("history_capacity"));
        }
        if SortKey::parse(&self.display.default_sort).is_none() {
            return Err(ConfigError::Sort(self.display.default_sort.clone()));
        }
        match self.display.output.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Output(other.to_string())),
        }
    }
}

impl DisplayConfig {
    /// Sort key named by `default_sort`, CPU when it names nothing known.
    pub fn sort_key(&self) -> SortKey {
        SortKey::parse(&self.default_sort).unwrap_or_default()
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("procpulse").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), %err, "ignoring unparsable config");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}
