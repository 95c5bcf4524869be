//! Daemon configuration
//!
//! Loaded from TOML (or YAML by file extension). Every section is optional.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//! path = "/ws"
//!
//! [simulation]
//! tick_ms = 100
//!
//! [latency]
//! mode = "simulated"
//!
//! [security]
//! max_failed_attempts = 3
//!
//! [[dtcs]]
//! code = "P0301"
//! status = "0x8F"
//! description = "Cylinder 1 Misfire Detected"
//! system = "Engine"
//!
//! [[dids]]
//! did = "0xF190"
//! name = "VIN"
//! text = "WBA12345678901234"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vnsim_uds::{EcuConfig, EcuConfigError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Ecu(#[from] EcuConfigError),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub latency: LatencyConfig,

    /// `[security]`, `[[dtcs]]` and `[[dids]]`
    #[serde(flatten)]
    pub ecu: EcuConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// WebSocket endpoint path
    #[serde(default = "default_ws_path")]
    pub path: String,

    /// Ticks a slow client may fall behind before frames are skipped
    #[serde(default = "default_telemetry_buffer")]
    pub telemetry_buffer: usize,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_telemetry_buffer() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_ws_path(),
            telemetry_buffer: default_telemetry_buffer(),
        }
    }
}

/// Vehicle simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Tick period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default)]
    pub initial_odometer_km: f64,

    #[serde(default = "default_fuel")]
    pub initial_fuel_percent: f64,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_fuel() -> f64 {
    100.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            initial_odometer_km: 0.0,
            initial_fuel_percent: default_fuel(),
        }
    }
}

impl SimulationConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// How diagnostic responses are delayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyMode {
    /// Random delay for positive responses, fixed delay for negative ones
    #[default]
    Simulated,
    /// Same delay for every response
    Fixed,
    /// Deliver on the next scheduler turn
    Immediate,
}

/// Response latency configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    #[serde(default)]
    pub mode: LatencyMode,

    #[serde(default = "default_positive_min_ms")]
    pub positive_min_ms: u64,

    /// Exclusive upper bound
    #[serde(default = "default_positive_max_ms")]
    pub positive_max_ms: u64,

    #[serde(default = "default_negative_ms")]
    pub negative_ms: u64,

    #[serde(default)]
    pub fixed_ms: u64,
}

fn default_positive_min_ms() -> u64 {
    50
}

fn default_positive_max_ms() -> u64 {
    150
}

fn default_negative_ms() -> u64 {
    50
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            mode: LatencyMode::default(),
            positive_min_ms: default_positive_min_ms(),
            positive_max_ms: default_positive_max_ms(),
            negative_ms: default_negative_ms(),
            fixed_ms: 0,
        }
    }
}

impl Config {
    /// Load configuration from a file; `.yaml`/`.yml` are parsed as YAML,
    /// anything else as TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Self = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and that the ECU tables build
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "simulation.tick_ms must be greater than 0".into(),
            ));
        }
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.path must start with '/', got {:?}",
                self.server.path
            )));
        }
        if self.latency.positive_min_ms > self.latency.positive_max_ms {
            return Err(ConfigError::Invalid(format!(
                "latency.positive_min_ms ({}) exceeds latency.positive_max_ms ({})",
                self.latency.positive_min_ms, self.latency.positive_max_ms
            )));
        }
        if !(0.0..=100.0).contains(&self.simulation.initial_fuel_percent) {
            return Err(ConfigError::Invalid(
                "simulation.initial_fuel_percent must be within 0..=100".into(),
            ));
        }
        if self.ecu.security.max_failed_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "security.max_failed_attempts must be at least 1".into(),
            ));
        }
        self.ecu.dtc_table()?;
        self.ecu.did_table()?;
        Ok(())
    }
}
