//! Device definitions for the simulated backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use iio_core::{AttrKey, AttrOwner, ChannelInfo, DataType, DeviceInfo, Direction};

use crate::backend::SimBackend;

/// Simulated device description, loadable from TOML.
///
/// ```toml
/// [[devices]]
/// id = "iio:device0"
/// name = "ad9361-phy"
/// attributes = ["calib_mode"]
///
/// [devices.values]
/// calib_mode = "auto"
///
/// [[devices.channels]]
/// id = "voltage0"
/// scan_element = true
/// index = 0
/// format = "le:s12/16>>4"
/// attributes = ["hardwaregain"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimDeviceConfig {
    /// Discovery record
    #[serde(flatten)]
    pub info: DeviceInfo,
    /// Initial device attribute values
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Simulated backend description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Devices to serve; empty means the demo device set
    #[serde(default)]
    pub devices: Vec<SimDeviceConfig>,
}

impl SimConfig {
    /// Build a backend from this description.
    pub fn into_backend(self) -> SimBackend {
        if self.devices.is_empty() {
            return demo_backend();
        }

        let values: Vec<(AttrKey, String)> = self
            .devices
            .iter()
            .flat_map(|d| {
                d.values.iter().map(|(name, value)| {
                    (AttrKey::new(AttrOwner::device(&d.info.id), name), value.clone())
                })
            })
            .collect();

        let backend = SimBackend::new(self.devices.into_iter().map(|d| d.info).collect());
        values
            .into_iter()
            .fold(backend, |backend, (key, value)| backend.with_value(key, value))
    }
}

fn adc_format() -> DataType {
    // 12-bit ADC samples, MSB-aligned in 16-bit words
    DataType {
        bits: 12,
        ..DataType::INT16.with_shift(4)
    }
}

/// A transceiver-like device with two I/Q-style inputs and an LO output.
pub fn transceiver(id: &str) -> DeviceInfo {
    DeviceInfo::new(id, "ad9361-phy")
        .with_attributes(["calib_mode", "ensm_mode", "rx_path_rates"])
        .with_channel(
            ChannelInfo::scan_input("voltage0", 0, adc_format())
                .with_name("RX1_I")
                .with_attributes(["hardwaregain", "rf_port_select", "sampling_frequency"]),
        )
        .with_channel(
            ChannelInfo::scan_input("voltage1", 1, adc_format())
                .with_name("RX1_Q")
                .with_attributes(["hardwaregain", "rf_port_select", "sampling_frequency"]),
        )
        .with_channel(
            ChannelInfo::attribute_only("altvoltage0", Direction::Output)
                .with_name("RX_LO")
                .with_attributes(["frequency", "powerdown"]),
        )
}

/// A housekeeping ADC with a temperature sensor and four scan inputs.
pub fn housekeeping_adc(id: &str) -> DeviceInfo {
    let unsigned12 = DataType {
        signed: false,
        ..adc_format()
    };
    let mut device = DeviceInfo::new(id, "xadc").with_attributes(["sampling_frequency"]);
    device = device.with_channel(
        ChannelInfo::attribute_only("temp0", Direction::Input)
            .with_attributes(["raw", "scale", "offset"]),
    );
    for index in 0..4u32 {
        device = device.with_channel(
            ChannelInfo::scan_input(format!("voltage{index}"), index, unsigned12)
                .with_attributes(["raw", "scale"]),
        );
    }
    device
}

/// Backend serving the demo device set.
pub fn demo_backend() -> SimBackend {
    SimBackend::new(vec![transceiver("iio:device0"), housekeeping_adc("iio:device1")])
        .with_value(
            AttrKey::new(AttrOwner::device("iio:device0"), "calib_mode"),
            "auto",
        )
        .with_value(
            AttrKey::new(AttrOwner::device("iio:device0"), "ensm_mode"),
            "fdd",
        )
        .with_value(
            AttrKey::new(AttrOwner::channel("iio:device0", "voltage0"), "rf_port_select"),
            "A_BALANCED",
        )
        .with_value(
            AttrKey::new(AttrOwner::channel("iio:device1", "temp0"), "scale"),
            "123.040771484",
        )
}
