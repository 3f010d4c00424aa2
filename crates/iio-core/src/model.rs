//! Device and channel descriptions produced by discovery.
//!
//! These records are immutable once the catalog has been built. The only
//! mutable runtime state of a channel (enabled or not) lives in the backend
//! and is reached through [`crate::catalog::DeviceHandle`].

use serde::{Deserialize, Serialize};

use crate::data_type::DataType;

/// Direction of a channel as seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Device to host (ADC, sensor)
    #[default]
    Input,
    /// Host to device (DAC, synthesizer)
    Output,
}

/// A single channel of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel identifier, unique per device and direction (e.g. `voltage0`)
    pub id: String,
    /// Optional label (e.g. `RX1_I`)
    #[serde(default)]
    pub name: Option<String>,
    /// Input or output
    #[serde(default)]
    pub direction: Direction,
    /// Whether samples are delivered through the shared buffer
    #[serde(default)]
    pub scan_element: bool,
    /// Position in the scan row (only meaningful for scan elements)
    #[serde(default)]
    pub index: u32,
    /// Storage format of one sample
    #[serde(default, rename = "format")]
    pub data_type: DataType,
    /// Attribute names, in discovery order
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl ChannelInfo {
    /// Create an input scan element with the given scan index and format.
    pub fn scan_input(id: impl Into<String>, index: u32, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            name: None,
            direction: Direction::Input,
            scan_element: true,
            index,
            data_type,
            attributes: Vec::new(),
        }
    }

    /// Create a channel that is only reachable through attributes.
    pub fn attribute_only(id: impl Into<String>, direction: Direction) -> Self {
        Self {
            id: id.into(),
            name: None,
            direction,
            scan_element: false,
            index: 0,
            data_type: DataType::default(),
            attributes: Vec::new(),
        }
    }

    /// Set the label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append attribute names.
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// True for device-to-host channels.
    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    /// True for host-to-device channels.
    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }
}

/// A discovered device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable identifier (e.g. `iio:device0`)
    pub id: String,
    /// Driver-reported name (e.g. `ad9361-phy`)
    pub name: String,
    /// Device attribute names, in discovery order
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Channels, in discovery order
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
}

impl DeviceInfo {
    /// Create a device without attributes or channels.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// Append attribute names.
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Append a channel.
    pub fn with_channel(mut self, channel: ChannelInfo) -> Self {
        self.channels.push(channel);
        self
    }

    /// Look up a channel by identifier.
    pub fn channel(&self, id: &str) -> Option<&ChannelInfo> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Display label used by configuration front-ends: `name (id)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_lookup() {
        let device = DeviceInfo::new("iio:device1", "cf-ad9361-lpc")
            .with_channel(ChannelInfo::scan_input("voltage0", 0, DataType::INT16))
            .with_channel(ChannelInfo::attribute_only("altvoltage0", Direction::Output));

        assert!(device.channel("voltage0").unwrap().is_input());
        assert!(device.channel("altvoltage0").unwrap().is_output());
        assert!(device.channel("voltage9").is_none());
        assert_eq!(device.label(), "cf-ad9361-lpc (iio:device1)");
    }

    #[test]
    fn test_deserialize_channel_defaults() {
        let channel: ChannelInfo = toml::from_str(
            r#"
            id = "temp0"
            attributes = ["raw", "scale"]
            "#,
        )
        .unwrap();

        assert_eq!(channel.direction, Direction::Input);
        assert!(!channel.scan_element);
        assert_eq!(channel.data_type, DataType::INT16);
        assert_eq!(channel.attributes, vec!["raw", "scale"]);
    }
}
