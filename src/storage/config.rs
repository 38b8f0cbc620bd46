//! Bridge configuration.
//!
//! Loaded from `config.toml` in the platform data directory. A missing file
//! yields the defaults; a present file may omit any section or field.

use crate::bridge::BridgeTiming;
use crate::sensors::ant::channels::DEFAULT_TRANSMISSION_TYPE;
use crate::sensors::scan::MacAddress;
use crate::sensors::types::DataSourceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which sensor to pair with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Backend to use
    pub kind: DataSourceKind,
    /// ANT device number of the power meter; 0 starts in setup mode
    pub device_id: u16,
    /// Hardware address of the broadcasting bike
    pub target_address: MacAddress,
    /// ANT transmission type
    pub transmission_type: u8,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: DataSourceKind::AntPlus,
            device_id: 1,
            target_address: MacAddress::default(),
            transmission_type: DEFAULT_TRANSMISSION_TYPE,
        }
    }
}

impl SourceSettings {
    /// An ANT+ source with no paired meter runs discovery instead.
    pub fn is_setup_mode(&self) -> bool {
        self.kind == DataSourceKind::AntPlus && self.device_id == 0
    }
}

/// Timer periods and timeouts, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub tick_ms: u64,
    pub check_ms: u64,
    pub data_timeout_ms: u64,
    pub inactivity_timeout_ms: u64,
    /// Scan backend: window without a matching advert before zeros
    pub scan_watchdog_ms: u64,
    /// How often time-driven backend checks run
    pub source_poll_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            check_ms: 2000,
            data_timeout_ms: 3000,
            inactivity_timeout_ms: 20000,
            scan_watchdog_ms: 1000,
            source_poll_ms: 250,
        }
    }
}

impl TimingSettings {
    /// Timing for the activity bridge.
    pub fn bridge_timing(&self) -> BridgeTiming {
        BridgeTiming {
            tick: Duration::from_millis(self.tick_ms),
            check: Duration::from_millis(self.check_ms),
            data_timeout: Duration::from_millis(self.data_timeout_ms),
            inactivity_timeout: Duration::from_millis(self.inactivity_timeout_ms),
        }
    }

    pub fn scan_watchdog(&self) -> Duration {
        Duration::from_millis(self.scan_watchdog_ms)
    }

    pub fn source_poll(&self) -> Duration {
        Duration::from_millis(self.source_poll_ms)
    }
}

/// Battery measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatterySettings {
    /// Seconds between measurements; 0 disables monitoring
    pub interval_secs: u64,
}

impl Default for BatterySettings {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

/// Output device identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Advertised name
    pub name: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: "RideBridge".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub source: SourceSettings,
    pub timing: TimingSettings,
    pub battery: BatterySettings,
    pub device: DeviceSettings,
}

impl BridgeConfig {
    /// Reject configurations the bridge cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;

        for (name, value) in [
            ("tick_ms", t.tick_ms),
            ("check_ms", t.check_ms),
            ("data_timeout_ms", t.data_timeout_ms),
            ("inactivity_timeout_ms", t.inactivity_timeout_ms),
            ("scan_watchdog_ms", t.scan_watchdog_ms),
            ("source_poll_ms", t.source_poll_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("timing.{} must be > 0", name)));
            }
        }

        if t.data_timeout_ms < t.tick_ms {
            return Err(ConfigError::Invalid(
                "timing.data_timeout_ms must be at least timing.tick_ms".to_string(),
            ));
        }

        if t.inactivity_timeout_ms < t.check_ms {
            return Err(ConfigError::Invalid(
                "timing.inactivity_timeout_ms must be at least timing.check_ms".to_string(),
            ));
        }

        if self.source.kind == DataSourceKind::KeiserBle && self.source.target_address.is_zero() {
            return Err(ConfigError::Invalid(
                "source.target_address must be set for keiser_ble".to_string(),
            ));
        }

        Ok(())
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "providenceit", "RideBridge")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load configuration from the default location.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load configuration from a file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<BridgeConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(BridgeConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let config: BridgeConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}

/// Save configuration to the default location.
pub fn save_config(config: &BridgeConfig) -> Result<(), ConfigError> {
    save_config_to(&get_config_path(), config)
}

/// Save configuration to a file, creating parent directories.
pub fn save_config_to(path: &Path, config: &BridgeConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
