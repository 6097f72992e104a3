//! Switching-board auto-discovery over the onboard I2C bus.
//!
//! Each 40-channel switching board carries a PCA9505-class expander and
//! claims the next consecutive I2C address after the configured base. The
//! probe walks chip slots 0..8, fingerprints each address by register
//! readback, and counts only a contiguous chain starting at chip 0.

use crate::device::{Result, RemoteDevice};
use crate::protocol::{
    CHANNELS_PER_BOARD, MAX_SWITCHING_BOARDS, PCA9505_CONFIG_IO_REGISTER,
    PCA9505_OUTPUT_PORT_REGISTER, PCA9505_PORT_COUNT,
};

/// Probe the switching-board chain and return the total channel count.
///
/// Per chip: write `0xFF` to the IO-direction register and read it back — a
/// mismatch means nobody answered at that address and the chain ends there.
/// Then flip all five ports to output mode (readback-verified) and drive the
/// outputs high. A chip that fails port configuration is skipped and, by the
/// contiguity rule, ends the usable chain as well.
///
/// Transport errors propagate; the caller decides whether to swallow them
/// (see [`crate::session::DeviceSession::initialize_switching_boards`]).
pub fn probe_switching_boards<D: RemoteDevice>(device: &D, base_address: u8) -> Result<u16> {
    let mut channels: u16 = 0;

    for chip in 0..MAX_SWITCHING_BOARDS {
        let address = base_address.wrapping_add(chip);

        // Fingerprint: all pins as inputs, then read the register back.
        device.i2c_write(address, &[PCA9505_CONFIG_IO_REGISTER, 0xFF])?;
        let readback = device.i2c_read(address, 1)?;
        if readback.first() != Some(&0xFF) {
            log::debug!("switching board probe: no expander at 0x{address:02x}, chain ends");
            break;
        }

        let mut configured = true;
        for port in 0..PCA9505_PORT_COUNT {
            // Output mode, verified by readback.
            device.i2c_write(address, &[PCA9505_CONFIG_IO_REGISTER + port, 0x00])?;
            let readback = device.i2c_read(address, 1)?;
            if readback.first() != Some(&0x00) {
                log::warn!(
                    "switching board at 0x{address:02x}: port {port} refused output mode, skipping chip"
                );
                configured = false;
                break;
            }
            // Drive outputs high (all channels open).
            device.i2c_write(address, &[PCA9505_OUTPUT_PORT_REGISTER + port, 0xFF])?;
        }

        // Count only a contiguous chain starting at chip 0.
        if configured && channels == CHANNELS_PER_BOARD * chip as u16 {
            channels = CHANNELS_PER_BOARD * (chip as u16 + 1);
            log::debug!(
                "switching board {chip} at 0x{address:02x}: ok, {channels} channels total"
            );
        }
    }

    Ok(channels)
}
