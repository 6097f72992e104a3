//! Device session — typed config/state access, orchestration, teardown.
//!
//! [`DeviceSession`] exclusively owns one [`RemoteDevice`] connection and is
//! the only place the protocol modules meet the transport. There is no
//! host-side cache: every getter is a fresh round trip, every setter is
//! transmitted immediately. Callers must serialize access to one session.

use crate::channels;
use crate::device::{Config, ConfigUpdate, DeviceError, RemoteDevice, State, StateUpdate};
use crate::discovery::probe_switching_boards;
use crate::error::{HvswitchError, Result};
use crate::identity::DeviceId;
use crate::sensor::{self, EnvironmentReading, SensorPoll};
use crate::settings::Settings;

/// Aggregate proxy for one connected instrument.
///
/// Lifecycle: constructed over an already-open transport (connected) →
/// optional explicit [`initialize_switching_boards`] (initialized) →
/// [`close`] or drop (closed, HV output disabled best-effort).
///
/// [`initialize_switching_boards`]: DeviceSession::initialize_switching_boards
/// [`close`]: DeviceSession::close
pub struct DeviceSession<D: RemoteDevice> {
    device: D,
    sensor_address: u8,
    poll: SensorPoll,
    initialized: bool,
    closed: bool,
}

impl<D: RemoteDevice> DeviceSession<D> {
    /// Wrap an open device connection with default sensor parameters.
    ///
    /// Never touches the I2C bus: switching-board discovery is a separate,
    /// explicit step because the bus may be busy right after connect.
    pub fn new(device: D) -> Self {
        DeviceSession {
            device,
            sensor_address: crate::protocol::HIH6000_I2C_ADDRESS,
            poll: SensorPoll::default(),
            initialized: false,
            closed: false,
        }
    }

    /// Wrap an open device connection, taking sensor address and poll
    /// tuning from host [`Settings`].
    pub fn with_settings(device: D, settings: &Settings) -> Self {
        DeviceSession {
            device,
            sensor_address: settings.sensor_address,
            poll: settings.sensor_poll(),
            initialized: false,
            closed: false,
        }
    }

    /// Whether switching-board discovery has populated the channel count.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Config accessors (one round trip each) ──

    /// Full configuration snapshot.
    pub fn config(&self) -> Result<Config> {
        Ok(self.device.read_config()?)
    }

    pub fn light_intensity(&self) -> Result<f32> {
        Ok(self.device.read_config()?.light_intensity)
    }

    pub fn set_light_intensity(&self, value: f32) -> Result<()> {
        Ok(self.device.update_config(&ConfigUpdate {
            light_intensity: Some(value),
            ..Default::default()
        })?)
    }

    pub fn baud_rate(&self) -> Result<u32> {
        Ok(self.device.read_config()?.baud_rate)
    }

    pub fn set_baud_rate(&self, value: u32) -> Result<()> {
        Ok(self.device.update_config(&ConfigUpdate {
            baud_rate: Some(value),
            ..Default::default()
        })?)
    }

    pub fn id(&self) -> Result<String> {
        Ok(self.device.read_config()?.id)
    }

    pub fn set_id(&self, value: &str) -> Result<()> {
        Ok(self.device.update_config(&ConfigUpdate {
            id: Some(value.to_owned()),
            ..Default::default()
        })?)
    }

    pub fn port(&self) -> Result<String> {
        Ok(self.device.read_config()?.port)
    }

    pub fn set_port(&self, value: &str) -> Result<()> {
        Ok(self.device.update_config(&ConfigUpdate {
            port: Some(value.to_owned()),
            ..Default::default()
        })?)
    }

    pub fn switching_board_i2c_address(&self) -> Result<u8> {
        Ok(self.device.read_config()?.switching_board_i2c_address)
    }

    pub fn set_switching_board_i2c_address(&self, address: u8) -> Result<()> {
        Ok(self.device.update_config(&ConfigUpdate {
            switching_board_i2c_address: Some(address),
            ..Default::default()
        })?)
    }

    /// Firmware-derived lower waveform frequency bound. Read-only.
    pub fn min_waveform_frequency(&self) -> Result<f32> {
        Ok(self.device.read_config()?.min_waveform_frequency)
    }

    /// Firmware-derived upper waveform frequency bound. Read-only.
    pub fn max_waveform_frequency(&self) -> Result<f32> {
        Ok(self.device.read_config()?.max_waveform_frequency)
    }

    /// Firmware-derived waveform voltage ceiling. Read-only.
    pub fn max_waveform_voltage(&self) -> Result<f32> {
        Ok(self.device.read_config()?.max_waveform_voltage)
    }

    // ── State accessors (one round trip each, no cross-field atomicity) ──

    /// Full volatile-state snapshot.
    pub fn state(&self) -> Result<State> {
        Ok(self.device.read_state()?)
    }

    pub fn magnet_engaged(&self) -> Result<bool> {
        Ok(self.device.read_state()?.magnet_engaged)
    }

    pub fn set_magnet_engaged(&self, value: bool) -> Result<()> {
        Ok(self.device.update_state(&StateUpdate {
            magnet_engaged: Some(value),
            ..Default::default()
        })?)
    }

    pub fn light_enabled(&self) -> Result<bool> {
        Ok(self.device.read_state()?.light_enabled)
    }

    pub fn set_light_enabled(&self, value: bool) -> Result<()> {
        Ok(self.device.update_state(&StateUpdate {
            light_enabled: Some(value),
            ..Default::default()
        })?)
    }

    pub fn frequency(&self) -> Result<f32> {
        Ok(self.device.read_state()?.frequency)
    }

    pub fn set_frequency(&self, value: f32) -> Result<()> {
        Ok(self.device.update_state(&StateUpdate {
            frequency: Some(value),
            ..Default::default()
        })?)
    }

    pub fn voltage(&self) -> Result<f32> {
        Ok(self.device.read_state()?.voltage)
    }

    pub fn set_voltage(&self, value: f32) -> Result<()> {
        Ok(self.device.update_state(&StateUpdate {
            voltage: Some(value),
            ..Default::default()
        })?)
    }

    pub fn hv_output_enabled(&self) -> Result<bool> {
        Ok(self.device.read_state()?.hv_output_enabled)
    }

    pub fn set_hv_output_enabled(&self, value: bool) -> Result<()> {
        Ok(self
            .device
            .update_state(&StateUpdate::hv_output_enabled(value))?)
    }

    pub fn hv_output_selected(&self) -> Result<bool> {
        Ok(self.device.read_state()?.hv_output_selected)
    }

    pub fn set_hv_output_selected(&self, value: bool) -> Result<()> {
        Ok(self.device.update_state(&StateUpdate {
            hv_output_selected: Some(value),
            ..Default::default()
        })?)
    }

    // ── Channels ──

    /// Current channel count as reported by the device.
    pub fn number_of_channels(&self) -> Result<u16> {
        Ok(self.device.number_of_channels()?)
    }

    /// Fetch and unpack the per-channel states, index 0 = first channel.
    pub fn channel_states(&self) -> Result<Vec<bool>> {
        let count = self.device.number_of_channels()? as usize;
        let bytes = self.device.channel_state_bytes()?;
        Ok(channels::unpack(&bytes, count))
    }

    /// Pack and transmit per-channel states.
    ///
    /// The length is validated against the device's current channel count
    /// before anything is transmitted; a mismatch never reaches the wire.
    pub fn set_channel_states(&self, states: &[bool]) -> Result<()> {
        let expected = self.device.number_of_channels()? as usize;
        if states.len() != expected {
            return Err(HvswitchError::ChannelCountMismatch {
                expected,
                actual: states.len(),
            });
        }
        let accepted = self.device.set_channel_state_bytes(&channels::pack(states))?;
        if !accepted {
            return Err(DeviceError::Rejected(
                "set_channel_state_bytes: device refused channel-state write".into(),
            )
            .into());
        }
        Ok(())
    }

    // ── Identity / environment / discovery ──

    /// Stable 128-bit board identity from the unique-ID register.
    pub fn identity(&self) -> Result<DeviceId> {
        let raw = self.device.unique_id_register()?;
        DeviceId::from_register_bytes(&raw)
    }

    /// One blocking humidity/temperature measurement from the onboard
    /// sensor, using the session's configured address and poll budget.
    pub fn environment(&self) -> Result<EnvironmentReading> {
        Ok(sensor::read_environment(
            &self.device,
            self.sensor_address,
            &self.poll,
        )?)
    }

    /// Probe the switching-board chain and report the channel count to the
    /// device. Explicit opt-in; never runs at construction.
    ///
    /// This is a deliberate swallow-all boundary: probe or report failures
    /// are logged and the device's channel count is left unchanged, because
    /// a half-probed bus is routine when boards are being swapped. Returns
    /// the discovered count, or `None` when discovery was aborted.
    pub fn initialize_switching_boards(&mut self) -> Option<u16> {
        let base = match self.device.read_config() {
            Ok(config) => config.switching_board_i2c_address,
            Err(e) => {
                log::warn!("switching board discovery aborted: {e}");
                return None;
            }
        };
        let count = match probe_switching_boards(&self.device, base) {
            Ok(count) => count,
            Err(e) => {
                log::warn!("switching board discovery aborted: {e}");
                return None;
            }
        };
        if let Err(e) = self.device.set_number_of_channels(count) {
            log::warn!("switching board discovery: could not report channel count: {e}");
            return None;
        }
        self.initialized = true;
        Some(count)
    }

    // ── Teardown ──

    /// Best-effort safety shutdown: disable the HV output, log and swallow
    /// any failure. Runs at most once per session.
    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self
            .device
            .update_state(&StateUpdate::hv_output_enabled(false))
        {
            log::warn!("could not disable HV output on close: {e}");
        }
    }

    /// Close the session, disabling the HV output best-effort. Failures
    /// (including a transport that is already gone) are never propagated.
    pub fn close(mut self) {
        self.shutdown();
    }
}

impl<D: RemoteDevice> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
