//! Integration tests: end-to-end session scenarios over MockDevice.
//!
//! These exercise the public API the way a plugin host would: connect,
//! discover switching boards, drive channels and state, poll the sensor,
//! and tear down — verifying the traffic that reaches the mock transport.

use hvswitch_lib::HvswitchError;
use hvswitch_lib::device::mock::MockDevice;
use hvswitch_lib::device::{RemoteDevice, StateUpdate};
use hvswitch_lib::session::DeviceSession;
use hvswitch_lib::settings::Settings;

/// Helper: settings with zero delays so tests never sleep for real.
fn fast_settings() -> Settings {
    Settings {
        sensor_settle_ms: 0,
        sensor_retry_ms: 0,
        ..Default::default()
    }
}

/// Helper: 4-byte big-endian sensor frame from the two data words.
fn sensor_frame(humidity_word: u16, temperature_word: u16) -> Vec<u8> {
    let mut frame = humidity_word.to_be_bytes().to_vec();
    frame.extend_from_slice(&temperature_word.to_be_bytes());
    frame
}

// ── Discovery → channel control ──

#[test]
fn discover_then_drive_channels() {
    let dev = MockDevice::new();
    let base = dev.read_config().unwrap().switching_board_i2c_address;
    for chip in 0..3 {
        dev.add_expander(base + chip);
    }

    let mut session = DeviceSession::new(&dev);
    assert_eq!(session.initialize_switching_boards(), Some(120));
    assert_eq!(session.number_of_channels().unwrap(), 120);

    // Drive an irregular pattern across all three boards and read it back.
    let states: Vec<bool> = (0..120).map(|i| i % 7 == 0).collect();
    session.set_channel_states(&states).unwrap();
    assert_eq!(session.channel_states().unwrap(), states);

    // The packed payload covers 120 channels in 15 bytes.
    assert_eq!(dev.channel_writes.borrow().last().unwrap().len(), 15);
}

#[test]
fn gapped_chain_counts_only_the_prefix() {
    let dev = MockDevice::new();
    let base = dev.read_config().unwrap().switching_board_i2c_address;
    dev.add_expander(base);
    dev.add_expander(base + 2); // chip 1 missing

    let mut session = DeviceSession::new(&dev);
    assert_eq!(session.initialize_switching_boards(), Some(40));
    assert_eq!(session.number_of_channels().unwrap(), 40);
}

#[test]
fn failed_discovery_leaves_previous_count_usable() {
    let dev = MockDevice::new();
    dev.set_channel_geometry(80);
    dev.fail_i2c.set(true);

    let mut session = DeviceSession::new(&dev);
    assert_eq!(session.initialize_switching_boards(), None);

    // The session stays usable at the old geometry.
    dev.fail_i2c.set(false);
    assert_eq!(session.number_of_channels().unwrap(), 80);
    session.set_channel_states(&vec![false; 80]).unwrap();
}

#[test]
fn mismatched_vector_never_reaches_the_wire() {
    let dev = MockDevice::new();
    let session = DeviceSession::new(&dev);

    let err = session.set_channel_states(&[true; 64]).unwrap_err();
    assert!(matches!(
        err,
        HvswitchError::ChannelCountMismatch {
            expected: 40,
            actual: 64
        }
    ));
    assert!(dev.channel_writes.borrow().is_empty());
    assert!(dev.i2c_writes.borrow().is_empty());
}

// ── Sensor through the session ──

#[test]
fn environment_poll_with_one_stale_retry() {
    let dev = MockDevice::new();
    let settings = fast_settings();
    dev.push_i2c_read(settings.sensor_address, sensor_frame(0x4000, 0)); // stale
    dev.push_i2c_read(settings.sensor_address, sensor_frame(0x0000, 0x0000)); // valid

    let session = DeviceSession::with_settings(&dev, &settings);
    let reading = session.environment().unwrap();
    assert_eq!(reading.relative_humidity, 0.0);
    assert_eq!(reading.temperature_celsius, -40.0);

    // Trigger write, then exactly two frame reads.
    assert_eq!(
        dev.i2c_writes.borrow().as_slice(),
        &[(settings.sensor_address, vec![])]
    );
    assert_eq!(dev.i2c_reads.borrow().len(), 2);
}

#[test]
fn environment_fault_status_surfaces_as_sensor_error() {
    let dev = MockDevice::new();
    let settings = fast_settings();
    dev.push_i2c_read(settings.sensor_address, sensor_frame(0x8000, 0)); // status 2

    let session = DeviceSession::with_settings(&dev, &settings);
    let err = session.environment().unwrap_err();
    assert!(matches!(err, HvswitchError::Sensor(_)));
    assert_eq!(dev.i2c_reads.borrow().len(), 1, "fault status never retries");
}

#[test]
fn environment_uses_configured_sensor_address() {
    let dev = MockDevice::new();
    let settings = Settings {
        sensor_address: 0x44,
        ..fast_settings()
    };
    dev.push_i2c_read(0x44, sensor_frame(0x1234, 0x2000));

    let session = DeviceSession::with_settings(&dev, &settings);
    session.environment().unwrap();
    assert_eq!(dev.i2c_writes.borrow()[0].0, 0x44);
    assert_eq!(dev.i2c_reads.borrow()[0].0, 0x44);
}

// ── Identity and snapshots ──

#[test]
fn identity_and_snapshots_serialize_for_host_tooling() {
    let dev = MockDevice::new();
    let session = DeviceSession::new(&dev);

    let id = session.identity().unwrap();
    assert_eq!(id.to_string(), "01020304-0506-0708-090a-0b0c0d0e0f10");

    // Snapshots are plain value objects a host UI can serialize.
    let config_json = serde_json::to_string(&session.config().unwrap()).unwrap();
    assert!(config_json.contains("\"max_waveform_voltage\":150.0"));
    let state_json = serde_json::to_string(&session.state().unwrap()).unwrap();
    assert!(state_json.contains("\"hv_output_enabled\":false"));
}

// ── State sequencing and teardown ──

#[test]
fn state_setters_are_independent_round_trips() {
    let dev = MockDevice::new();
    let session = DeviceSession::new(&dev);

    session.set_voltage(85.0).unwrap();
    session.set_frequency(2_000.0).unwrap();
    session.set_hv_output_enabled(true).unwrap();

    // Three separate single-field updates, in order — no batching.
    let updates = dev.state_updates.borrow();
    assert_eq!(updates.len(), 3);
    assert_eq!(updates[0].voltage, Some(85.0));
    assert_eq!(updates[0].frequency, None);
    assert_eq!(updates[1].frequency, Some(2_000.0));
    assert_eq!(updates[2].hv_output_enabled, Some(true));
}

#[test]
fn drop_disables_hv_output_after_a_run() {
    let dev = MockDevice::new();
    {
        let session = DeviceSession::new(&dev);
        session.set_hv_output_enabled(true).unwrap();
        session.set_voltage(120.0).unwrap();
        // Session dropped without close() — e.g. the host panicked past it.
    }
    let state = dev.read_state().unwrap();
    assert!(!state.hv_output_enabled, "drop must disable the HV output");
    assert_eq!(state.voltage, 120.0, "teardown touches only the HV enable");
}

#[test]
fn teardown_with_dead_transport_is_silent() {
    let dev = MockDevice::new();
    dev.update_state(&StateUpdate::hv_output_enabled(true))
        .unwrap();
    dev.fail_update_state.set(true);

    let session = DeviceSession::new(&dev);
    session.close(); // must not panic or propagate

    // The device was unreachable, so the state is whatever it was.
    dev.fail_update_state.set(false);
    assert!(dev.read_state().unwrap().hv_output_enabled);
}

#[test]
fn full_lifecycle() {
    let dev = MockDevice::new();
    let base = dev.read_config().unwrap().switching_board_i2c_address;
    dev.add_expander(base);
    let settings = fast_settings();
    dev.push_i2c_read(settings.sensor_address, sensor_frame(0x2000, 0x4000));

    {
        let mut session = DeviceSession::with_settings(&dev, &settings);
        assert!(!session.is_initialized());
        assert_eq!(session.initialize_switching_boards(), Some(40));
        assert!(session.is_initialized());

        session.set_hv_output_selected(true).unwrap();
        session.set_hv_output_enabled(true).unwrap();
        session.set_voltage(100.0).unwrap();

        let mut states = vec![false; 40];
        states[3] = true;
        states[17] = true;
        session.set_channel_states(&states).unwrap();

        let reading = session.environment().unwrap();
        assert!(reading.relative_humidity > 0.0);
        assert!(reading.temperature_celsius > -40.0);

        session.close();
    }

    let state = dev.read_state().unwrap();
    assert!(!state.hv_output_enabled, "close must disable the HV output");
    assert!(state.hv_output_selected, "close must not touch other fields");

    // Channel 3 → bit 3 of byte 0; channel 17 → bit 1 of byte 2.
    let bytes = dev.channel_state_bytes().unwrap();
    assert_eq!(bytes, vec![0x08, 0x00, 0x02, 0x00, 0x00]);
}
