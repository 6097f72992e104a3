//! Unified error type for the hvswitch-lib crate.
//!
//! [`HvswitchError`] wraps module-specific errors (`DeviceError`,
//! `SensorError`) and crate-level error kinds. `From` impls allow `?` to
//! propagate across module boundaries seamlessly.

use std::fmt;

use crate::device::DeviceError;
use crate::sensor::SensorError;

/// Unified error type for hvswitch-lib operations.
#[derive(Debug)]
pub enum HvswitchError {
    /// RPC/I2C transport failure or a device-side refusal.
    Device(DeviceError),
    /// Environment sensor fault, short frame, or poll timeout.
    Sensor(SensorError),
    /// A channel-state vector's length doesn't match the device's current
    /// channel count. Raised before anything is transmitted.
    ChannelCountMismatch { expected: usize, actual: usize },
    /// The unique-ID register read was not exactly 16 bytes.
    MalformedIdentity { len: usize },
    /// Standard I/O error (settings persistence).
    Io(std::io::Error),
    /// Settings parse or serialization error.
    Settings(String),
}

impl fmt::Display for HvswitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HvswitchError::Device(e) => write!(f, "{e}"),
            HvswitchError::Sensor(e) => write!(f, "{e}"),
            HvswitchError::ChannelCountMismatch { expected, actual } => write!(
                f,
                "Channel count mismatch: device has {expected} channels, got {actual} states"
            ),
            HvswitchError::MalformedIdentity { len } => write!(
                f,
                "Malformed identity: unique-ID register returned {len} bytes, expected 16"
            ),
            HvswitchError::Io(e) => write!(f, "I/O error: {e}"),
            HvswitchError::Settings(e) => write!(f, "Settings error: {e}"),
        }
    }
}

impl std::error::Error for HvswitchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HvswitchError::Device(e) => Some(e),
            HvswitchError::Sensor(e) => Some(e),
            HvswitchError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeviceError> for HvswitchError {
    fn from(e: DeviceError) -> Self {
        HvswitchError::Device(e)
    }
}

impl From<SensorError> for HvswitchError {
    fn from(e: SensorError) -> Self {
        HvswitchError::Sensor(e)
    }
}

impl From<std::io::Error> for HvswitchError {
    fn from(e: std::io::Error) -> Self {
        HvswitchError::Io(e)
    }
}

/// Crate-level Result alias using [`HvswitchError`].
pub type Result<T> = std::result::Result<T, HvswitchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_device_error() {
        let e: HvswitchError = DeviceError::Transport("gone".into()).into();
        assert!(matches!(e, HvswitchError::Device(DeviceError::Transport(_))));
    }

    #[test]
    fn from_sensor_error() {
        let e: HvswitchError = SensorError::InvalidStatus(2).into();
        assert!(matches!(e, HvswitchError::Sensor(SensorError::InvalidStatus(2))));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: HvswitchError = io_err.into();
        assert!(matches!(e, HvswitchError::Io(_)));
    }

    #[test]
    fn display_channel_count_mismatch() {
        let e = HvswitchError::ChannelCountMismatch {
            expected: 40,
            actual: 39,
        };
        assert_eq!(
            e.to_string(),
            "Channel count mismatch: device has 40 channels, got 39 states"
        );
    }

    #[test]
    fn display_malformed_identity() {
        let e = HvswitchError::MalformedIdentity { len: 15 };
        assert_eq!(
            e.to_string(),
            "Malformed identity: unique-ID register returned 15 bytes, expected 16"
        );
    }

    #[test]
    fn source_chains_device_error() {
        let e = HvswitchError::Device(DeviceError::Transport("timeout".into()));
        let source = std::error::Error::source(&e).unwrap();
        assert!(source.to_string().contains("timeout"));
    }

    #[test]
    fn source_chains_sensor_transport_error() {
        let e = HvswitchError::Sensor(SensorError::Transport(DeviceError::Transport(
            "bus fault".into(),
        )));
        let sensor = std::error::Error::source(&e).unwrap();
        let device = std::error::Error::source(sensor).unwrap();
        assert!(device.to_string().contains("bus fault"));
    }

    #[test]
    fn source_none_for_plain_variants() {
        let e = HvswitchError::ChannelCountMismatch {
            expected: 40,
            actual: 0,
        };
        assert!(std::error::Error::source(&e).is_none());
    }

    #[test]
    fn question_mark_propagation_device_to_crate() {
        fn inner() -> crate::device::Result<()> {
            Err(DeviceError::Transport("nope".into()))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        let err = outer().unwrap_err();
        assert!(matches!(err, HvswitchError::Device(_)));
    }

    #[test]
    fn question_mark_propagation_sensor_to_crate() {
        fn inner() -> crate::sensor::Result<()> {
            Err(SensorError::Timeout { attempts: 50 })
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        let err = outer().unwrap_err();
        assert!(matches!(
            err,
            HvswitchError::Sensor(SensorError::Timeout { attempts: 50 })
        ));
    }
}
