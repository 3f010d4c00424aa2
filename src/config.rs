//! Application configuration using Figment
//!
//! Configuration is loaded from:
//! 1. A TOML file (default `config/iio-stream.toml`)
//! 2. Environment variables prefixed with `IIO_STREAM_`, using `__` between
//!    nesting levels (e.g. `IIO_STREAM_SOURCE__BUFFER_SIZE=512`)
//!
//! # Example
//! ```no_run
//! use iio_stream::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("Streaming from: {}", config.source.device_id);
//! # Ok::<(), iio_stream::AppError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use iio_sim::SimConfig;
use iio_source::SourceConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/iio-stream.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "IIO_STREAM_";

/// Upper bound on the per-turn readiness wait.
pub const MAX_TIMEOUT_MS: u64 = 60_000;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration
///
/// Every section and field has a default, so a partial or absent file loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Source block settings
    pub source: SourceConfig,
    /// Host scheduler settings
    pub scheduler: SchedulerConfig,
    /// Simulated hardware settings
    pub simulation: SimulationConfig,
    /// Sample capture settings
    pub output: OutputConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "iio-stream".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored (development)
    #[default]
    Pretty,
    /// Single-line, uncolored
    Compact,
    /// Newline-delimited JSON (log aggregation)
    Json,
}

/// Host scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Longest a single `work()` call may block, in milliseconds
    pub max_timeout_ms: u64,
    /// Number of scheduling turns to run
    pub turns: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_timeout_ms: 100,
            turns: 1000,
        }
    }
}

impl SchedulerConfig {
    /// Per-turn timeout as a duration.
    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }
}

/// Simulated hardware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Scan rows generated per second
    pub sample_rate_hz: f64,
    /// Scan rows generated per clock tick
    pub rows_per_tick: usize,
    /// Simulated devices; empty means the demo device set
    #[serde(flatten)]
    pub backend: SimConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100_000.0,
            rows_per_tick: 256,
            backend: SimConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Interval between sample clock ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.rows_per_tick as f64 / self.sample_rate_hz)
    }
}

/// Sample capture configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving one raw `<channel>.bin` file per output stream;
    /// samples are only counted when unset
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path and environment variables.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and the environment apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> AppResult<()> {
        let level = self.application.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(AppError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if self.scheduler.max_timeout_ms == 0 || self.scheduler.max_timeout_ms > MAX_TIMEOUT_MS {
            return Err(AppError::Configuration(format!(
                "Invalid max_timeout_ms {}. Must be 1-{}",
                self.scheduler.max_timeout_ms, MAX_TIMEOUT_MS
            )));
        }

        if self.scheduler.turns == 0 {
            return Err(AppError::Configuration(
                "scheduler.turns must be greater than 0".to_string(),
            ));
        }

        if !(self.simulation.sample_rate_hz.is_finite() && self.simulation.sample_rate_hz > 0.0) {
            return Err(AppError::Configuration(format!(
                "Invalid sample_rate_hz {}. Must be positive",
                self.simulation.sample_rate_hz
            )));
        }

        if self.simulation.rows_per_tick == 0 {
            return Err(AppError::Configuration(
                "simulation.rows_per_tick must be greater than 0".to_string(),
            ));
        }

        self.source.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.source.buffer_size, 2048);
        assert!(config.source.enable_ports);
        assert_eq!(config.scheduler.max_timeout(), Duration::from_millis(100));
        assert!(config.output.directory.is_none());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = AppConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.application.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_scheduler() {
        let mut config = AppConfig::default();
        config.scheduler.max_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.scheduler.max_timeout_ms = MAX_TIMEOUT_MS + 1;
        assert!(config.validate().is_err());

        config.scheduler.max_timeout_ms = 10;
        config.scheduler.turns = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_source_is_rejected() {
        let mut config = AppConfig::default();
        config.source.buffer_size = 0;
        assert!(matches!(config.validate(), Err(AppError::Source(_))));
    }

    #[test]
    fn test_tick_interval() {
        let simulation = SimulationConfig {
            sample_rate_hz: 1000.0,
            rows_per_tick: 10,
            ..Default::default()
        };
        assert_eq!(simulation.tick_interval(), Duration::from_millis(10));
    }
}
