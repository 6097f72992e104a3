//! Remote device capability — trait, value structs, and test mock.
//!
//! The RPC transport (serial port, socket, whatever carries the control
//! protocol) lives outside this crate. Everything here talks to it through
//! [`RemoteDevice`]: one trait method is one request/response round trip
//! that either succeeds or fails with a transport error.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Error type ──

/// Device communication errors.
///
/// String payloads follow the convention **"context: details"** where
/// *context* identifies the operation (e.g. `"i2c_read"`, `"update_state"`)
/// and *details* describes what went wrong.
#[derive(Debug)]
pub enum DeviceError {
    /// The RPC or I2C round trip failed (transport gone, timeout, NAK).
    Transport(String),
    /// The device answered but refused the request.
    Rejected(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Transport(e) => write!(f, "Transport error: {e}"),
            DeviceError::Rejected(e) => write!(f, "Request rejected by device: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Config / State value structs ──

/// Persistent configuration stored on the device.
///
/// The three waveform limits are derived by the firmware from the installed
/// hardware and are read-only: they appear here in snapshots but have no
/// counterpart in [`ConfigUpdate`], so they cannot be written from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub light_intensity: f32,
    pub baud_rate: u32,
    pub id: String,
    pub port: String,
    /// Read-only, firmware-derived.
    pub min_waveform_frequency: f32,
    /// Read-only, firmware-derived.
    pub max_waveform_frequency: f32,
    /// Read-only, firmware-derived.
    pub max_waveform_voltage: f32,
    /// Base I2C address of the first switching board in the chain.
    pub switching_board_i2c_address: u8,
}

/// Partial update of the writable [`Config`] fields. `None` fields are left
/// untouched on the device; one update is one RPC round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub light_intensity: Option<f32>,
    pub baud_rate: Option<u32>,
    pub id: Option<String>,
    pub port: Option<String>,
    pub switching_board_i2c_address: Option<u8>,
}

/// Volatile device state. Every field is re-read from the device on access;
/// there is no host-side cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub magnet_engaged: bool,
    pub light_enabled: bool,
    pub frequency: f32,
    pub voltage: f32,
    pub hv_output_enabled: bool,
    pub hv_output_selected: bool,
}

/// Partial update of [`State`] fields. Each update is a single round trip;
/// setting several fields across successive updates is not atomic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub magnet_engaged: Option<bool>,
    pub light_enabled: Option<bool>,
    pub frequency: Option<f32>,
    pub voltage: Option<f32>,
    pub hv_output_enabled: Option<bool>,
    pub hv_output_selected: Option<bool>,
}

impl StateUpdate {
    /// Update that only touches `hv_output_enabled`. Used by the session's
    /// best-effort teardown.
    pub fn hv_output_enabled(enabled: bool) -> Self {
        StateUpdate {
            hv_output_enabled: Some(enabled),
            ..Default::default()
        }
    }
}

// ── Trait ──

/// One open connection to the instrument's control plane.
///
/// Implementations are expected to be synchronous and blocking: a call
/// returns once the device has answered or the transport has failed.
/// Callers must serialize access — interleaved I2C transactions from two
/// threads would corrupt sensor and expander state.
pub trait RemoteDevice {
    /// Read the full persistent configuration.
    fn read_config(&self) -> Result<Config>;
    /// Apply a partial configuration update.
    fn update_config(&self, update: &ConfigUpdate) -> Result<()>;
    /// Read the full volatile state.
    fn read_state(&self) -> Result<State>;
    /// Apply a partial state update.
    fn update_state(&self, update: &StateUpdate) -> Result<()>;

    /// Write `bytes` to `address` on the onboard I2C bus. An empty write is
    /// a bare address cycle (used to trigger sensor measurements).
    fn i2c_write(&self, address: u8, bytes: &[u8]) -> Result<()>;
    /// Read `count` bytes from `address` on the onboard I2C bus.
    fn i2c_read(&self, address: u8, count: usize) -> Result<Vec<u8>>;

    /// Fetch the packed channel-state bytes (see [`crate::channels`]).
    fn channel_state_bytes(&self) -> Result<Vec<u8>>;
    /// Send packed channel-state bytes. Returns `false` when the device
    /// refuses them (wrong length for its current channel count).
    fn set_channel_state_bytes(&self, bytes: &[u8]) -> Result<bool>;

    /// Current channel count as reported by the device.
    fn number_of_channels(&self) -> Result<u16>;
    /// Report a new channel count (after switching-board discovery).
    fn set_number_of_channels(&self, count: u16) -> Result<()>;

    /// Raw contents of the hardware unique-identification register
    /// (16 bytes on a healthy board).
    fn unique_id_register(&self) -> Result<Vec<u8>>;
}

/// Shared references forward to the underlying device, so a session can
/// borrow a device another component still owns (tests do this a lot).
impl<D: RemoteDevice + ?Sized> RemoteDevice for &D {
    fn read_config(&self) -> Result<Config> {
        (**self).read_config()
    }
    fn update_config(&self, update: &ConfigUpdate) -> Result<()> {
        (**self).update_config(update)
    }
    fn read_state(&self) -> Result<State> {
        (**self).read_state()
    }
    fn update_state(&self, update: &StateUpdate) -> Result<()> {
        (**self).update_state(update)
    }
    fn i2c_write(&self, address: u8, bytes: &[u8]) -> Result<()> {
        (**self).i2c_write(address, bytes)
    }
    fn i2c_read(&self, address: u8, count: usize) -> Result<Vec<u8>> {
        (**self).i2c_read(address, count)
    }
    fn channel_state_bytes(&self) -> Result<Vec<u8>> {
        (**self).channel_state_bytes()
    }
    fn set_channel_state_bytes(&self, bytes: &[u8]) -> Result<bool> {
        (**self).set_channel_state_bytes(bytes)
    }
    fn number_of_channels(&self) -> Result<u16> {
        (**self).number_of_channels()
    }
    fn set_number_of_channels(&self, count: u16) -> Result<()> {
        (**self).set_number_of_channels(count)
    }
    fn unique_id_register(&self) -> Result<Vec<u8>> {
        (**self).unique_id_register()
    }
}

// ── Mock device for testing ──

/// In-memory mock device for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// Register-level emulation of one PCA9505 expander on the mock bus.
    ///
    /// A 2-byte write sets the register pointer and the register; a 1-byte
    /// write only moves the pointer; reads return the pointed-at register.
    #[derive(Debug, Default, Clone)]
    pub struct Expander {
        registers: HashMap<u8, u8>,
        pointer: u8,
    }

    impl Expander {
        fn write(&mut self, bytes: &[u8]) {
            match bytes {
                [reg] => self.pointer = *reg,
                [reg, value, ..] => {
                    self.pointer = *reg;
                    self.registers.insert(*reg, *value);
                }
                [] => {}
            }
        }

        fn read(&self, count: usize) -> Vec<u8> {
            // Sequential reads auto-increment the register pointer.
            (0..count)
                .map(|i| {
                    let reg = self.pointer.wrapping_add(i as u8);
                    self.registers.get(&reg).copied().unwrap_or(0x00)
                })
                .collect()
        }

        /// Register contents, for assertions.
        pub fn register(&self, reg: u8) -> Option<u8> {
            self.registers.get(&reg).copied()
        }
    }

    /// In-memory device. Config/state live in `RefCell`s; I2C traffic is
    /// recorded, and reads are answered from (in priority order) scripted
    /// per-address queues, emulated expanders, or all-zeros for absent
    /// addresses — a bus with nobody driving it.
    pub struct MockDevice {
        pub config: RefCell<Config>,
        pub state: RefCell<State>,
        pub channel_bytes: RefCell<Vec<u8>>,
        pub channel_count: Cell<u16>,
        pub uid_register: RefCell<Vec<u8>>,
        /// Every accepted `update_state` patch in order.
        pub state_updates: RefCell<Vec<StateUpdate>>,
        /// Every `i2c_write` in order: (address, bytes).
        pub i2c_writes: RefCell<Vec<(u8, Vec<u8>)>>,
        /// Every `i2c_read` in order: (address, count).
        pub i2c_reads: RefCell<Vec<(u8, usize)>>,
        /// Scripted read responses per address, consumed front-first.
        pub i2c_read_queue: RefCell<HashMap<u8, Vec<Vec<u8>>>>,
        /// Emulated PCA9505 chips keyed by I2C address.
        pub expanders: RefCell<HashMap<u8, Expander>>,
        /// Every accepted `set_channel_state_bytes` payload.
        pub channel_writes: RefCell<Vec<Vec<u8>>>,
        /// Fail all I2C traffic with a transport error.
        pub fail_i2c: Cell<bool>,
        /// Fail `update_state` with a transport error (dead-transport tests).
        pub fail_update_state: Cell<bool>,
        /// Force `set_channel_state_bytes` to return `false`.
        pub reject_channel_bytes: Cell<bool>,
    }

    impl Default for MockDevice {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockDevice {
        pub fn new() -> Self {
            MockDevice {
                config: RefCell::new(Config {
                    light_intensity: 0.5,
                    baud_rate: 115_200,
                    id: "mock-board".into(),
                    port: "/dev/ttyACM0".into(),
                    min_waveform_frequency: 100.0,
                    max_waveform_frequency: 20_000.0,
                    max_waveform_voltage: 150.0,
                    switching_board_i2c_address: 0x20,
                }),
                state: RefCell::new(State {
                    magnet_engaged: false,
                    light_enabled: false,
                    frequency: 1_000.0,
                    voltage: 0.0,
                    hv_output_enabled: false,
                    hv_output_selected: false,
                }),
                state_updates: RefCell::new(Vec::new()),
                channel_bytes: RefCell::new(vec![0; 5]),
                channel_count: Cell::new(40),
                uid_register: RefCell::new((1..=16).collect()),
                i2c_writes: RefCell::new(Vec::new()),
                i2c_reads: RefCell::new(Vec::new()),
                i2c_read_queue: RefCell::new(HashMap::new()),
                expanders: RefCell::new(HashMap::new()),
                channel_writes: RefCell::new(Vec::new()),
                fail_i2c: Cell::new(false),
                fail_update_state: Cell::new(false),
                reject_channel_bytes: Cell::new(false),
            }
        }

        /// Queue a scripted response for the next `i2c_read` at `address`.
        pub fn push_i2c_read(&self, address: u8, response: Vec<u8>) {
            self.i2c_read_queue
                .borrow_mut()
                .entry(address)
                .or_default()
                .push(response);
        }

        /// Attach an emulated PCA9505 at `address`.
        pub fn add_expander(&self, address: u8) {
            self.expanders
                .borrow_mut()
                .insert(address, Expander::default());
        }

        /// Set the channel count and size the backing byte store to match.
        pub fn set_channel_geometry(&self, count: u16) {
            self.channel_count.set(count);
            *self.channel_bytes.borrow_mut() = vec![0; count.div_ceil(8) as usize];
        }
    }

    impl RemoteDevice for MockDevice {
        fn read_config(&self) -> Result<Config> {
            Ok(self.config.borrow().clone())
        }

        fn update_config(&self, update: &ConfigUpdate) -> Result<()> {
            let mut config = self.config.borrow_mut();
            if let Some(v) = update.light_intensity {
                config.light_intensity = v;
            }
            if let Some(v) = update.baud_rate {
                config.baud_rate = v;
            }
            if let Some(v) = &update.id {
                config.id = v.clone();
            }
            if let Some(v) = &update.port {
                config.port = v.clone();
            }
            if let Some(v) = update.switching_board_i2c_address {
                config.switching_board_i2c_address = v;
            }
            Ok(())
        }

        fn read_state(&self) -> Result<State> {
            Ok(self.state.borrow().clone())
        }

        fn update_state(&self, update: &StateUpdate) -> Result<()> {
            if self.fail_update_state.get() {
                return Err(DeviceError::Transport(
                    "update_state: mock transport down".into(),
                ));
            }
            self.state_updates.borrow_mut().push(update.clone());
            let mut state = self.state.borrow_mut();
            if let Some(v) = update.magnet_engaged {
                state.magnet_engaged = v;
            }
            if let Some(v) = update.light_enabled {
                state.light_enabled = v;
            }
            if let Some(v) = update.frequency {
                state.frequency = v;
            }
            if let Some(v) = update.voltage {
                state.voltage = v;
            }
            if let Some(v) = update.hv_output_enabled {
                state.hv_output_enabled = v;
            }
            if let Some(v) = update.hv_output_selected {
                state.hv_output_selected = v;
            }
            Ok(())
        }

        fn i2c_write(&self, address: u8, bytes: &[u8]) -> Result<()> {
            if self.fail_i2c.get() {
                return Err(DeviceError::Transport("i2c_write: mock bus fault".into()));
            }
            self.i2c_writes
                .borrow_mut()
                .push((address, bytes.to_vec()));
            if let Some(expander) = self.expanders.borrow_mut().get_mut(&address) {
                expander.write(bytes);
            }
            Ok(())
        }

        fn i2c_read(&self, address: u8, count: usize) -> Result<Vec<u8>> {
            if self.fail_i2c.get() {
                return Err(DeviceError::Transport("i2c_read: mock bus fault".into()));
            }
            self.i2c_reads.borrow_mut().push((address, count));
            if let Some(queue) = self.i2c_read_queue.borrow_mut().get_mut(&address)
                && !queue.is_empty()
            {
                return Ok(queue.remove(0));
            }
            if let Some(expander) = self.expanders.borrow().get(&address) {
                return Ok(expander.read(count));
            }
            Ok(vec![0x00; count])
        }

        fn channel_state_bytes(&self) -> Result<Vec<u8>> {
            Ok(self.channel_bytes.borrow().clone())
        }

        fn set_channel_state_bytes(&self, bytes: &[u8]) -> Result<bool> {
            let expected = self.channel_count.get().div_ceil(8) as usize;
            if self.reject_channel_bytes.get() || bytes.len() != expected {
                return Ok(false);
            }
            *self.channel_bytes.borrow_mut() = bytes.to_vec();
            self.channel_writes.borrow_mut().push(bytes.to_vec());
            Ok(true)
        }

        fn number_of_channels(&self) -> Result<u16> {
            Ok(self.channel_count.get())
        }

        fn set_number_of_channels(&self, count: u16) -> Result<()> {
            self.set_channel_geometry(count);
            Ok(())
        }

        fn unique_id_register(&self) -> Result<Vec<u8>> {
            Ok(self.uid_register.borrow().clone())
        }
    }
}
