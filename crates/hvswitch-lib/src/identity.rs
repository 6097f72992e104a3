//! Device identity decoded from the hardware unique-ID register.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::HvswitchError;
use crate::protocol::UNIQUE_ID_LEN;

/// 128-bit identifier burned into the microcontroller's unique-ID register.
/// Stable for the lifetime of the physical board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId([u8; UNIQUE_ID_LEN]);

impl DeviceId {
    /// Decode a raw register read. The register is exactly 16 bytes wide, so
    /// anything else means the read was truncated or garbled.
    pub fn from_register_bytes(raw: &[u8]) -> Result<Self, HvswitchError> {
        let bytes: [u8; UNIQUE_ID_LEN] = raw
            .try_into()
            .map_err(|_| HvswitchError::MalformedIdentity { len: raw.len() })?;
        Ok(DeviceId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; UNIQUE_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    /// Canonical hyphenated form: 8-4-4-4-12 lowercase hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15],
        )
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
