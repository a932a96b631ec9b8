//! Configuration for the mesamate application
//!
//! Loaded from a TOML file. Every field has a default, so a partial file (or
//! none at all) reproduces the deployed restaurant setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mesamate_core::{DEFAULT_THRESHOLD, Pos};
use mesamate_link::{DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_CAPACITY};
use mesamate_route::{DEFAULT_MAX_STATIONS, StationId, StationTable};
use serde::{Deserialize, Serialize};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MesamateConfig {
    pub map: MapConfig,
    pub stations: StationTable,
    pub serial: SerialConfig,
    pub run: RunConfig,
    pub logging: LoggingConfig,
}

/// Floor plan
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    /// Grayscale raster of the floor plan
    pub image: PathBuf,
    /// Pixels at or below this intensity are blocked
    pub threshold: u8,
    /// Home cell as `[row, col]`; top row, middle column when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<Pos>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from("map.png"),
            threshold: DEFAULT_THRESHOLD,
            home: None,
        }
    }
}

/// Serial link to the motion controller
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    /// Candidate ports, tried in order
    pub ports: Vec<String>,
    pub baud_rate: u32,
    /// Wait after opening while the board resets
    pub settle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            ports: ["/dev/ttyACM0", "/dev/ttyUSB0", "/dev/ttyAMA0"]
                .map(String::from)
                .to_vec(),
            baud_rate: mesamate_link::DEFAULT_BAUD_RATE,
            settle_ms: 2000,
        }
    }
}

impl SerialConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Delivery run behaviour
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub max_stations: usize,
    /// Acknowledgment wait before the operator is told; absent waits forever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_timeout_ms: Option<u64>,
    /// Listener sleep when the port has no data
    pub poll_interval_ms: u64,
    pub queue_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_stations: DEFAULT_MAX_STATIONS,
            ack_timeout_ms: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl RunConfig {
    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout_ms.map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter (trace, debug, info, warn, error); `RUST_LOG` wins
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl MesamateConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the values serde cannot. Grid-dependent checks (stations on
    /// free cells) happen once the floor plan is loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cap = StationId::ALL.len();
        if self.run.max_stations == 0 || self.run.max_stations > cap {
            return Err(ConfigError::Invalid(format!(
                "run.max_stations must be between 1 and {cap}, got {}",
                self.run.max_stations
            )));
        }
        if self.run.queue_capacity == 0 {
            return Err(ConfigError::Invalid("run.queue_capacity must be positive".into()));
        }
        if self.run.ack_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("run.ack_timeout_ms must be positive".into()));
        }
        if self.serial.ports.is_empty() {
            return Err(ConfigError::Invalid("serial.ports is empty".into()));
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("serial.baud_rate must be positive".into()));
        }
        if self.stations.is_empty() {
            return Err(ConfigError::Invalid("no stations configured".into()));
        }
        Ok(())
    }
}

impl std::str::FromStr for MesamateConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: MesamateConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
