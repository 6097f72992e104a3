//! Humidity/temperature polling for the HIH6000-class sensor.
//!
//! Measurement protocol: an empty I2C write triggers a conversion, then the
//! host reads 4-byte frames until the status bits report fresh data. The
//! frame is two big-endian 16-bit words; the top two bits of the humidity
//! word carry the status.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::device::{DeviceError, RemoteDevice};
use crate::protocol::{
    SENSOR_FRAME_LEN, SENSOR_FULL_SCALE, SENSOR_MAX_ATTEMPTS, SENSOR_RETRY_INTERVAL,
    SENSOR_SETTLE, SENSOR_STATUS_STALE, SENSOR_STATUS_VALID,
};

// ── Error type ──

/// Sensor polling errors.
#[derive(Debug)]
pub enum SensorError {
    /// The underlying I2C round trip failed.
    Transport(DeviceError),
    /// The sensor answered with fewer than 4 bytes.
    ShortFrame { got: usize },
    /// The sensor reported a fault status (anything above stale).
    InvalidStatus(u8),
    /// The sensor kept reporting stale data for the whole retry budget.
    Timeout { attempts: u32 },
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Transport(e) => write!(f, "Sensor transport failure: {e}"),
            SensorError::ShortFrame { got } => {
                write!(f, "Short sensor frame: got {got} of {SENSOR_FRAME_LEN} bytes")
            }
            SensorError::InvalidStatus(status) => {
                write!(f, "Sensor reported fault status {status}")
            }
            SensorError::Timeout { attempts } => {
                write!(f, "Sensor data still stale after {attempts} reads")
            }
        }
    }
}

impl std::error::Error for SensorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SensorError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for SensorError {
    fn from(e: DeviceError) -> Self {
        SensorError::Transport(e)
    }
}

pub type Result<T> = std::result::Result<T, SensorError>;

// ── Poll parameters ──

/// Timing and retry budget for one measurement poll.
///
/// The reference firmware-side protocol re-reads forever while the sensor
/// reports stale data; `max_attempts` bounds that loop so a wedged sensor
/// surfaces as [`SensorError::Timeout`] instead of hanging the caller.
#[derive(Debug, Clone)]
pub struct SensorPoll {
    /// Delay between triggering the measurement and the first read.
    pub settle: Duration,
    /// Delay between stale-status re-reads.
    pub retry_interval: Duration,
    /// Maximum number of reads before giving up. Must be at least 1.
    pub max_attempts: u32,
}

impl Default for SensorPoll {
    fn default() -> Self {
        SensorPoll {
            settle: SENSOR_SETTLE,
            retry_interval: SENSOR_RETRY_INTERVAL,
            max_attempts: SENSOR_MAX_ATTEMPTS,
        }
    }
}

// ── Reading ──

/// One decoded environment measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvironmentReading {
    /// Relative humidity, 0.0..=1.0.
    pub relative_humidity: f64,
    /// Temperature in degrees Celsius, −40..=125.
    pub temperature_celsius: f64,
}

/// Decode the two data words of a valid frame.
///
/// Humidity is the low 14 bits of the first word; temperature is bits 2..16
/// of the second, scaled to the −40..125 °C range.
fn decode_words(humidity_word: u16, temperature_word: u16) -> EnvironmentReading {
    EnvironmentReading {
        relative_humidity: (humidity_word & 0x3FFF) as f64 / SENSOR_FULL_SCALE,
        temperature_celsius: ((temperature_word >> 2) & 0x3FFF) as f64 / SENSOR_FULL_SCALE
            * 165.0
            - 40.0,
    }
}

/// Acquire one humidity/temperature measurement, blocking the caller.
///
/// Triggers a conversion, waits `poll.settle`, then reads frames until the
/// status bits clear. Stale status is the only condition retried; a fault
/// status or transport failure aborts immediately.
pub fn read_environment<D: RemoteDevice>(
    device: &D,
    address: u8,
    poll: &SensorPoll,
) -> Result<EnvironmentReading> {
    // Trigger measurement: bare address cycle, no payload.
    device.i2c_write(address, &[])?;
    thread::sleep(poll.settle);

    for attempt in 0..poll.max_attempts {
        if attempt > 0 {
            thread::sleep(poll.retry_interval);
        }
        let frame = device.i2c_read(address, SENSOR_FRAME_LEN)?;
        if frame.len() < SENSOR_FRAME_LEN {
            return Err(SensorError::ShortFrame { got: frame.len() });
        }
        let humidity_word = u16::from_be_bytes([frame[0], frame[1]]);
        let temperature_word = u16::from_be_bytes([frame[2], frame[3]]);

        let status = (humidity_word >> 14) as u8;
        if status == SENSOR_STATUS_VALID {
            return Ok(decode_words(humidity_word, temperature_word));
        }
        if status != SENSOR_STATUS_STALE {
            return Err(SensorError::InvalidStatus(status));
        }
        log::debug!("sensor 0x{address:02x}: stale data on read {}", attempt + 1);
    }

    Err(SensorError::Timeout {
        attempts: poll.max_attempts,
    })
}
