//! Process configuration for the Orion bridge
//!
//! Loaded once at startup from a TOML file and never mutated; changing any
//! setting requires a restart.

use orion_core::UnitSystem;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSection {
    /// Hostname or IP address of the MicroServer
    pub host: String,

    /// HTTP port the MicroServer listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSection {
    /// Seconds between cycle starts
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Fetch attempts per cycle, including the first
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Seconds between fetch attempts
    #[serde(default = "default_retry_wait_secs")]
    pub retry_wait_secs: u64,

    /// Per-request HTTP timeout, seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_tries: default_max_tries(),
            retry_wait_secs: default_retry_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitsSection {
    /// Unit system the downstream consumer expects
    #[serde(default = "default_target")]
    pub target: UnitSystem,
}

impl Default for UnitsSection {
    fn default() -> Self {
        Self {
            target: default_target(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub station: StationSection,

    #[serde(default)]
    pub poll: PollSection,

    #[serde(default)]
    pub units: UnitsSection,
}

fn default_port() -> u16 {
    80
}
fn default_interval_secs() -> u64 {
    15
}
fn default_max_tries() -> u32 {
    3
}
fn default_retry_wait_secs() -> u64 {
    5
}
fn default_request_timeout_secs() -> u64 {
    4
}
fn default_target() -> UnitSystem {
    UnitSystem::Us
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl BridgeConfig {
    /// Load from the path in `ORION_CONFIG`, defaulting to `orion.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("ORION_CONFIG").unwrap_or_else(|_| "orion.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.station.host.trim().is_empty() {
            return Err(ConfigError::Invalid("station.host must not be empty".into()));
        }
        if self.station.port == 0 {
            return Err(ConfigError::Invalid("station.port must be 1-65535".into()));
        }
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid("poll.interval_secs must be positive".into()));
        }
        if self.poll.max_tries == 0 {
            return Err(ConfigError::Invalid("poll.max_tries must be at least 1".into()));
        }
        if self.poll.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.poll.retry_wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.poll.request_timeout_secs)
    }
}
