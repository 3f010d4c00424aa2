//! Attribute access through a source.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use iio_core::{AttrKey, AttrOwner, Catalog, IioError};
use iio_sim::demo_backend;
use iio_source::{IioSource, SourceConfig, SourceError};

const PHY: &str = "iio:device0";

fn source_with(channels: &[&str]) -> IioSource {
    let backend = demo_backend().with_read_only(AttrKey::new(
        AttrOwner::device(PHY),
        "rx_path_rates",
    ));
    let catalog = Arc::new(Catalog::new(Arc::new(backend)).unwrap());
    let config = SourceConfig::builder()
        .device_id(PHY)
        .channel_ids(channels)
        .buffer_size(64)
        .build()
        .unwrap();
    IioSource::new(catalog, config).unwrap()
}

#[test]
fn registry_covers_device_and_selected_channels() {
    let source = source_with(&["voltage0"]);
    let names: Vec<String> = source.attributes().keys().map(|k| k.to_string()).collect();

    assert_eq!(
        names,
        vec![
            "deviceAttribute[calib_mode]",
            "deviceAttribute[ensm_mode]",
            "deviceAttribute[rx_path_rates]",
            "channelAttribute[voltage0][hardwaregain]",
            "channelAttribute[voltage0][rf_port_select]",
            "channelAttribute[voltage0][sampling_frequency]",
        ]
    );
    assert!(!source
        .attributes()
        .contains(&source.channel_attribute("voltage1", "hardwaregain")));
    assert!(!source
        .attributes()
        .contains(&source.channel_attribute("altvoltage0", "frequency")));
}

#[test]
fn get_and_set_round_trip() {
    let source = source_with(&[]);

    let calib = source.device_attribute("calib_mode");
    assert_eq!(source.get_attribute(&calib).unwrap(), "auto");

    let gain = source.channel_attribute("voltage1", "hardwaregain");
    source.set_attribute(&gain, "71.000000 dB").unwrap();
    assert_eq!(source.get_attribute(&gain).unwrap(), "71.000000 dB");

    let port = source.channel_attribute("voltage0", "rf_port_select");
    assert_eq!(source.get_attribute(&port).unwrap(), "A_BALANCED");
}

#[test]
fn probe_returns_timestamped_value() {
    let source = source_with(&[]);
    let key = source.device_attribute("ensm_mode");

    let before = Utc::now();
    let reading = source.probe_attribute(&key).unwrap();
    assert_eq!(reading.key, key);
    assert_eq!(reading.value, "fdd");
    assert!(reading.timestamp >= before);
}

#[test]
fn unknown_attribute_is_not_found() {
    let source = source_with(&["voltage0"]);

    let err = source
        .get_attribute(&source.device_attribute("no_such_attr"))
        .unwrap_err();
    assert!(matches!(
        err,
        SourceError::Backend(IioError::AttributeNotFound { .. })
    ));

    let err = source
        .set_attribute(&source.channel_attribute("voltage1", "hardwaregain"), "0")
        .unwrap_err();
    assert!(matches!(
        err,
        SourceError::Backend(IioError::AttributeNotFound { .. })
    ));
}

#[test]
fn read_only_attribute_rejects_writes() {
    let source = source_with(&[]);
    let err = source
        .set_attribute(&source.device_attribute("rx_path_rates"), "BBPLL:983040000")
        .unwrap_err();
    assert!(matches!(
        err,
        SourceError::Backend(IioError::AttributeAccess { .. })
    ));
}

#[test]
fn attributes_work_in_every_engine_state() {
    let mut source = source_with(&["voltage0", "voltage1"]);
    let key = source.device_attribute("ensm_mode");

    source.set_attribute(&key, "rx").unwrap();
    source.activate().unwrap();
    assert_eq!(source.get_attribute(&key).unwrap(), "rx");
    assert_eq!(
        source.work(Duration::from_millis(5)).unwrap(),
        iio_source::WorkOutcome::Yielded
    );
    source.set_attribute(&key, "fdd").unwrap();
    source.deactivate();
    assert_eq!(source.get_attribute(&key).unwrap(), "fdd");
}

#[test]
fn overlay_lists_catalog_devices() {
    let source = source_with(&[]);
    let overlay = source.overlay();
    let options = overlay["params"][0]["options"].as_array().unwrap();
    assert_eq!(options.len(), 3);
    assert_eq!(options[1]["value"], "\"iio:device0\"");
}
