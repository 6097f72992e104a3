//! Protocol constants for the switching instrument's onboard I2C peripherals.
//!
//! Register addresses match the PCA9505 datasheet and the HIH6000 series
//! application note. The control board itself is reached through the RPC
//! transport (see [`crate::device::RemoteDevice`]); these constants only
//! describe the chips hanging off its I2C bus.

use std::time::Duration;

// ── PCA9505 I/O expander (switching boards) ──

/// IO-direction configuration register for port 0. `0xFF` = all pins input,
/// `0x00` = all pins output. Ports 1..4 follow at consecutive addresses.
pub const PCA9505_CONFIG_IO_REGISTER: u8 = 0x18;

/// Output port register for port 0; drive level when a pin is in output
/// mode. Ports 1..4 follow at consecutive addresses.
pub const PCA9505_OUTPUT_PORT_REGISTER: u8 = 0x08;

/// Number of 8-bit ports per PCA9505.
pub const PCA9505_PORT_COUNT: u8 = 5;

/// Channels provided by one switching board (5 ports × 8 pins).
pub const CHANNELS_PER_BOARD: u16 = 40;

/// Maximum number of daisy-chained switching boards. Each board claims the
/// next consecutive I2C address after the configured base address.
pub const MAX_SWITCHING_BOARDS: u8 = 8;

// ── HIH6000-class humidity/temperature sensor ──

/// Factory-default I2C address of the HIH6000 series sensor.
pub const HIH6000_I2C_ADDRESS: u8 = 0x27;

/// Measurement frame size: two big-endian 16-bit words
/// (status+humidity, temperature).
pub const SENSOR_FRAME_LEN: usize = 4;

/// Status bits (top 2 bits of the humidity word): measurement valid.
pub const SENSOR_STATUS_VALID: u8 = 0;

/// Status bits: stale data, measurement still in progress.
pub const SENSOR_STATUS_STALE: u8 = 1;

/// Full-scale divisor for the 14-bit humidity/temperature counts
/// (`(1 << 14) - 2`; `0x3FFF` is reserved).
pub const SENSOR_FULL_SCALE: f64 = 16382.0;

/// Settle delay between triggering a measurement and the first read.
pub const SENSOR_SETTLE: Duration = Duration::from_millis(10);

/// Delay between re-reads while the sensor reports stale data.
pub const SENSOR_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Default cap on stale-status re-reads before giving up. The HIH6000
/// conversion completes in ~37 ms; 50 retries at 1 ms is comfortably past
/// that without hanging the caller when a sensor wedges.
pub const SENSOR_MAX_ATTEMPTS: u32 = 50;

// ── Unique-ID register ──

/// Width of the hardware unique-identification register in bytes.
pub const UNIQUE_ID_LEN: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pca9505_register_banks_do_not_overlap() {
        // Output port bank (0x08..0x0D) sits below the config bank (0x18..0x1D).
        const {
            assert!(
                PCA9505_OUTPUT_PORT_REGISTER + PCA9505_PORT_COUNT <= PCA9505_CONFIG_IO_REGISTER
            )
        };
    }

    #[test]
    fn channels_per_board_matches_port_geometry() {
        assert_eq!(CHANNELS_PER_BOARD, PCA9505_PORT_COUNT as u16 * 8);
    }

    #[test]
    fn board_chain_fits_seven_bit_address_space() {
        // A full chain above the sensor's default address must stay within
        // the 7-bit I2C address space.
        assert!(HIH6000_I2C_ADDRESS as u16 + MAX_SWITCHING_BOARDS as u16 <= 0x7F);
    }

    #[test]
    fn sensor_status_codes_distinct() {
        assert_ne!(SENSOR_STATUS_VALID, SENSOR_STATUS_STALE);
    }

    #[test]
    fn sensor_retry_budget_covers_conversion_time() {
        let worst_case = SENSOR_SETTLE + SENSOR_RETRY_INTERVAL * SENSOR_MAX_ATTEMPTS;
        assert!(worst_case >= Duration::from_millis(37));
    }

    #[test]
    fn full_scale_is_fourteen_bits_minus_reserved() {
        assert_eq!(SENSOR_FULL_SCALE, ((1u32 << 14) - 2) as f64);
    }
}
