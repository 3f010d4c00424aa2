//! Configuration loading from TOML files and environment overrides.

use std::fs;

use iio_stream::config::{AppConfig, LogFormat};
use serial_test::serial;
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iio-stream.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("IIO_STREAM_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn loads_file_over_defaults() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
        [application]
        log_level = "debug"
        log_format = "json"

        [source]
        deviceId = "iio:device1"
        bufferSize = 512

        [scheduler]
        turns = 20
        "#,
    );

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.application.log_format, LogFormat::Json);
    assert_eq!(config.source.device_id, "iio:device1");
    assert_eq!(config.source.buffer_size, 512);
    assert!(config.source.enable_ports);
    assert_eq!(config.scheduler.turns, 20);
    assert_eq!(config.scheduler.max_timeout_ms, 100);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.application.name, "iio-stream");
    assert!(config.source.device_id.is_empty());
    assert_eq!(config.source.buffer_size, 2048);
}

#[test]
#[serial]
fn environment_overrides_file() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
        [source]
        device_id = "iio:device0"
        buffer_size = 1024

        [scheduler]
        max_timeout_ms = 50
        "#,
    );

    std::env::set_var("IIO_STREAM_SOURCE__BUFFER_SIZE", "256");
    std::env::set_var("IIO_STREAM_SCHEDULER__MAX_TIMEOUT_MS", "5");
    let config = AppConfig::load_from(&path);
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.source.device_id, "iio:device0");
    assert_eq!(config.source.buffer_size, 256);
    assert_eq!(config.scheduler.max_timeout_ms, 5);
}

#[test]
#[serial]
fn simulated_devices_from_file() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
        [source]
        device_id = "iio:device4"

        [simulation]
        rows_per_tick = 16

        [[simulation.devices]]
        id = "iio:device4"
        name = "ad7124"
        attributes = ["sampling_frequency"]

        [[simulation.devices.channels]]
        id = "voltage0"
        scan_element = true
        format = "le:s24/32>>8"
        "#,
    );

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.simulation.rows_per_tick, 16);
    assert_eq!(config.simulation.backend.devices.len(), 1);

    let backend = iio_stream::simulated_backend(&config.simulation);
    let catalog = iio_stream::build_catalog(backend).unwrap();
    let device = catalog.resolve("iio:device4").unwrap();
    assert_eq!(device.info().name, "ad7124");
    assert_eq!(
        device.info().channel("voltage0").unwrap().data_type.type_name(),
        "int32"
    );
}

#[test]
#[serial]
fn invalid_values_fail_validation() {
    clear_env();
    let (_dir, path) = write_config(
        r#"
        [application]
        log_level = "chatty"
        "#,
    );
    let config = AppConfig::load_from(&path).unwrap();
    assert!(config.validate().is_err());

    let (_dir, path) = write_config(
        r#"
        [source]
        buffer_size = 1024
        port_capacity = 100
        "#,
    );
    let config = AppConfig::load_from(&path).unwrap();
    assert!(config.validate().is_err());
}
