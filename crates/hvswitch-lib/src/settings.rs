//! Host-side settings — TOML-based, platform-aware paths.
//!
//! These tune how the host talks to the instrument (sensor address, poll
//! timing); everything the device itself persists lives in
//! [`crate::device::Config`] and round-trips through the device instead.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::{HIH6000_I2C_ADDRESS, SENSOR_MAX_ATTEMPTS};
use crate::sensor::SensorPoll;

/// Header comment prepended to saved settings files.
const SETTINGS_HEADER: &str =
    "# hvswitch host settings — changes made while a session is open take effect on the next call.\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// I2C address of the humidity/temperature sensor. Default: 0x27.
    #[serde(default = "default_sensor_address")]
    pub sensor_address: u8,

    /// Settle delay after triggering a measurement, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub sensor_settle_ms: u64,

    /// Delay between stale-status re-reads, in milliseconds.
    #[serde(default = "default_retry_ms")]
    pub sensor_retry_ms: u64,

    /// Maximum sensor reads before a poll times out.
    #[serde(default = "default_max_attempts")]
    pub sensor_max_attempts: u32,
}

fn default_sensor_address() -> u8 {
    HIH6000_I2C_ADDRESS
}
fn default_settle_ms() -> u64 {
    10
}
fn default_retry_ms() -> u64 {
    1
}
fn default_max_attempts() -> u32 {
    SENSOR_MAX_ATTEMPTS
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sensor_address: default_sensor_address(),
            sensor_settle_ms: default_settle_ms(),
            sensor_retry_ms: default_retry_ms(),
            sensor_max_attempts: default_max_attempts(),
        }
    }
}

/// Validation errors that [`Settings::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The sensor address is not a usable 7-bit I2C address.
    InvalidSensorAddress(u8),
    /// The retry budget is zero — a poll could never read anything.
    ZeroMaxAttempts,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidSensorAddress(addr) => {
                write!(f, "Invalid sensor I2C address 0x{addr:02x} (need 0x01..=0x7f)")
            }
            ValidationError::ZeroMaxAttempts => {
                write!(f, "sensor_max_attempts must be at least 1")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl Settings {
    /// Default settings file location: `<config dir>/hvswitch/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hvswitch").join("config.toml"))
    }

    /// Load settings from `path`. A missing file yields defaults; a present
    /// file may omit any field (serde defaults fill the gaps).
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let text = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&text)
            .map_err(|e| crate::error::HvswitchError::Settings(format!("parse {path:?}: {e}")))?;
        Ok(settings)
    }

    /// Save settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HvswitchError::Settings(format!("serialize: {e}")))?;
        fs::write(path, format!("{SETTINGS_HEADER}{body}"))?;
        Ok(())
    }

    /// Check field ranges. Address 0 is the I2C general call and never a
    /// sensor; addresses above 0x7F don't fit the 7-bit address space.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.sensor_address == 0 || self.sensor_address > 0x7F {
            return Err(ValidationError::InvalidSensorAddress(self.sensor_address));
        }
        if self.sensor_max_attempts == 0 {
            return Err(ValidationError::ZeroMaxAttempts);
        }
        Ok(())
    }

    /// Poll parameters for [`crate::sensor::read_environment`].
    pub fn sensor_poll(&self) -> SensorPoll {
        SensorPoll {
            settle: Duration::from_millis(self.sensor_settle_ms),
            retry_interval: Duration::from_millis(self.sensor_retry_ms),
            max_attempts: self.sensor_max_attempts,
        }
    }
}
