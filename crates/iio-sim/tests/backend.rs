//! Behaviour of the simulated backend through the core traits.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use iio_core::{AttrKey, AttrOwner, Catalog, IioBackend, IioError, Readiness};
use iio_sim::{demo_backend, pattern_value, SimBackend};

fn enable_rx(backend: &SimBackend) {
    backend.enable_channel("iio:device0", "voltage0").unwrap();
    backend.enable_channel("iio:device0", "voltage1").unwrap();
}

fn to_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_ne_bytes([b[0], b[1]]))
        .collect()
}

#[test]
fn buffer_delivers_pattern_rows() {
    let backend = demo_backend();
    enable_rx(&backend);

    let mut buffer = backend.create_buffer("iio:device0", 16, false).unwrap();
    buffer.set_blocking_mode(false).unwrap();
    assert_eq!(buffer.step(), 4);

    let feed = backend.feed("iio:device0").unwrap();
    feed.push_rows(8);

    assert_eq!(
        buffer.wait_ready(Duration::from_secs(1)).unwrap(),
        Readiness::Ready
    );
    assert_eq!(buffer.refill().unwrap(), 32);

    let mut i_samples = [0u8; 16];
    let mut q_samples = [0u8; 16];
    assert_eq!(buffer.read_channel("voltage0", &mut i_samples, 8).unwrap(), 16);
    assert_eq!(buffer.read_channel("voltage1", &mut q_samples, 8).unwrap(), 16);

    let expected_i: Vec<i16> = (0..8).map(|r| pattern_value(r, 0) as i16).collect();
    let expected_q: Vec<i16> = (0..8).map(|r| pattern_value(r, 1) as i16).collect();
    assert_eq!(to_i16(&i_samples), expected_i);
    assert_eq!(to_i16(&q_samples), expected_q);
}

#[test]
fn refill_is_capped_at_capacity_and_stays_ready() {
    let backend = demo_backend();
    enable_rx(&backend);
    let mut buffer = backend.create_buffer("iio:device0", 4, false).unwrap();
    buffer.set_blocking_mode(false).unwrap();

    let feed = backend.feed("iio:device0").unwrap();
    feed.push_rows(10);

    assert_eq!(buffer.refill().unwrap(), 16);
    assert_eq!(
        buffer.wait_ready(Duration::from_millis(100)).unwrap(),
        Readiness::Ready
    );
    assert_eq!(buffer.refill().unwrap(), 16);
    assert_eq!(buffer.refill().unwrap(), 8);
}

#[test]
fn wait_times_out_without_samples() {
    let backend = demo_backend();
    enable_rx(&backend);
    let buffer = backend.create_buffer("iio:device0", 4, false).unwrap();
    assert_eq!(
        buffer.wait_ready(Duration::from_millis(10)).unwrap(),
        Readiness::TimedOut
    );
}

#[test]
fn injected_wait_failure_is_reported_once() {
    let backend = demo_backend();
    enable_rx(&backend);
    let buffer = backend.create_buffer("iio:device0", 4, false).unwrap();
    let feed = backend.feed("iio:device0").unwrap();

    feed.fail_next_wait(io::ErrorKind::BrokenPipe);
    let err = buffer.wait_ready(Duration::from_millis(10)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    assert!(buffer.wait_ready(Duration::from_millis(10)).is_ok());
}

#[test]
fn only_one_buffer_per_device() {
    let backend = demo_backend();
    enable_rx(&backend);

    let first = backend.create_buffer("iio:device0", 4, false).unwrap();
    let second = backend.create_buffer("iio:device0", 4, false);
    assert!(matches!(second, Err(IioError::DeviceBusy { .. })));
    assert!(backend.is_reserved("iio:device0"));

    drop(first);
    assert!(!backend.is_reserved("iio:device0"));
    assert!(backend.create_buffer("iio:device0", 4, false).is_ok());
    assert_eq!(backend.allocation_count("iio:device0"), 2);
}

#[test]
fn buffer_requires_enabled_scan_elements() {
    let backend = demo_backend();
    let result = backend.create_buffer("iio:device0", 4, false);
    assert!(matches!(result, Err(IioError::BufferAllocation { .. })));
}

#[test]
fn attributes_round_trip_and_respect_read_only() {
    let scale = AttrKey::new(AttrOwner::channel("iio:device1", "temp0"), "scale");
    let raw = AttrKey::new(AttrOwner::channel("iio:device1", "temp0"), "raw");
    let backend = demo_backend().with_read_only(raw.clone());

    assert_eq!(backend.read_attribute(&scale).unwrap(), "123.040771484");
    backend.write_attribute(&scale, "1.0").unwrap();
    assert_eq!(backend.read_attribute(&scale).unwrap(), "1.0");

    assert!(matches!(
        backend.write_attribute(&raw, "5"),
        Err(IioError::AttributeAccess { .. })
    ));
    let unknown = AttrKey::new(AttrOwner::device("iio:device1"), "nope");
    assert!(matches!(
        backend.read_attribute(&unknown),
        Err(IioError::AttributeNotFound { .. })
    ));
}

#[test]
fn catalog_over_simulated_backend() {
    let backend: Arc<dyn IioBackend> = Arc::new(demo_backend());
    let catalog = Catalog::new(backend).unwrap();

    let ids: Vec<_> = catalog.devices().map(|d| d.id.clone()).collect();
    assert_eq!(ids, vec!["iio:device0", "iio:device1"]);
    // Restartable
    assert_eq!(catalog.devices().count(), 2);

    let phy = catalog.resolve("iio:device0").unwrap();
    assert_eq!(phy.info().name, "ad9361-phy");
    assert_eq!(phy.attribute("ensm_mode").unwrap(), "fdd");
    phy.enable_channel("voltage0").unwrap();
    assert!(phy.is_channel_enabled("voltage0").unwrap());
    phy.disable_channel("voltage0").unwrap();
    assert!(!phy.is_channel_enabled("voltage0").unwrap());
    assert!(matches!(
        phy.enable_channel("voltage9"),
        Err(IioError::ChannelNotFound { .. })
    ));

    let missing = catalog.resolve("iio:device9").unwrap_err();
    assert!(missing.is_not_found());
}

#[test]
fn sample_clock_pushes_rows_until_stopped() {
    let backend = demo_backend();
    enable_rx(&backend);
    let _buffer = backend.create_buffer("iio:device0", 4, false).unwrap();
    let feed = backend.feed("iio:device0").unwrap();

    let clock = feed.start_clock(2, Duration::from_millis(1));
    std::thread::sleep(Duration::from_millis(20));
    clock.stop();

    let generated = feed.rows_generated();
    assert!(generated >= 2);
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(feed.rows_generated(), generated);
}

#[test]
fn backend_clock_runs_while_buffer_is_held() {
    let backend = demo_backend().with_sample_clock(4, Duration::from_millis(1));
    enable_rx(&backend);

    let mut buffer = backend.create_buffer("iio:device0", 64, false).unwrap();
    buffer.set_blocking_mode(false).unwrap();
    assert_eq!(
        buffer.wait_ready(Duration::from_secs(1)).unwrap(),
        Readiness::Ready
    );
    let bytes = buffer.refill().unwrap();
    assert!(bytes > 0);
    assert_eq!(bytes % buffer.step(), 0);

    let feed = backend.feed("iio:device0").unwrap();
    drop(buffer);
    assert!(!backend.is_reserved("iio:device0"));
    let generated = feed.rows_generated();
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(feed.rows_generated(), generated);
}

#[test]
fn injected_channel_read_faults_apply_once() {
    let backend = demo_backend();
    enable_rx(&backend);
    let mut buffer = backend.create_buffer("iio:device0", 16, false).unwrap();
    buffer.set_blocking_mode(false).unwrap();

    let feed = backend.feed("iio:device0").unwrap();
    feed.push_rows(8);
    assert_eq!(buffer.refill().unwrap(), 32);

    feed.fail_next_read("voltage0", "bus error");
    feed.truncate_next_read("voltage1", 3);
    let mut out = [0u8; 16];

    let err = buffer.read_channel("voltage0", &mut out, 8).unwrap_err();
    assert!(matches!(err, IioError::Backend { ref message } if message == "bus error"));
    assert_eq!(buffer.read_channel("voltage1", &mut out, 8).unwrap(), 6);

    assert_eq!(buffer.read_channel("voltage0", &mut out, 8).unwrap(), 16);
    assert_eq!(buffer.read_channel("voltage1", &mut out, 8).unwrap(), 16);
}
