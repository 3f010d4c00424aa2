//! Selection of the channels a source instance streams.

use iio_core::{ChannelInfo, DeviceInfo};
use tracing::warn;

/// Input channels chosen for one source instance, in device order.
///
/// A channel is selected if and only if it is an input channel and either the
/// allow-list is empty or contains its identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSet {
    channels: Vec<ChannelInfo>,
}

impl ChannelSet {
    /// Apply the selection rule to a device.
    ///
    /// Allow-list entries that name no input channel of the device are logged
    /// and otherwise ignored.
    pub fn select(device: &DeviceInfo, allow: &[String]) -> Self {
        let channels: Vec<ChannelInfo> = device
            .channels
            .iter()
            .filter(|c| c.is_input())
            .filter(|c| allow.is_empty() || allow.iter().any(|id| *id == c.id))
            .cloned()
            .collect();

        for id in allow {
            if !channels.iter().any(|c| c.id == *id) {
                warn!(
                    device = %device.id,
                    channel = %id,
                    "Configured channel is not an input channel of the device; ignoring"
                );
            }
        }

        Self { channels }
    }

    /// Selected channels.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.channels.iter()
    }

    /// Selected channels that are delivered through the buffer.
    pub fn scan_elements(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.channels.iter().filter(|c| c.scan_element)
    }

    /// True if at least one selected channel is a scan element.
    pub fn has_scan_elements(&self) -> bool {
        self.scan_elements().next().is_some()
    }

    /// True if the channel is selected.
    pub fn contains(&self, id: &str) -> bool {
        self.channels.iter().any(|c| c.id == id)
    }

    /// Number of selected channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iio_core::{DataType, Direction};
    use tracing_test::traced_test;

    fn device() -> DeviceInfo {
        DeviceInfo::new("ad9361-phy", "ad9361-phy")
            .with_channel(ChannelInfo::scan_input("voltage0", 0, DataType::INT16))
            .with_channel(ChannelInfo::scan_input("voltage1", 1, DataType::INT16))
            .with_channel(ChannelInfo::attribute_only("temp0", Direction::Input))
            .with_channel(ChannelInfo::attribute_only("altvoltage0", Direction::Output))
    }

    #[test]
    fn test_empty_allow_list_selects_all_inputs() {
        let set = ChannelSet::select(&device(), &[]);
        let ids: Vec<_> = set.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["voltage0", "voltage1", "temp0"]);
        assert_eq!(set.scan_elements().count(), 2);
    }

    #[test]
    fn test_allow_list_filters() {
        let set = ChannelSet::select(&device(), &["voltage1".to_string()]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("voltage1"));
        assert!(!set.contains("voltage0"));
    }

    #[test]
    fn test_output_channels_never_selected() {
        let set = ChannelSet::select(&device(), &["altvoltage0".to_string()]);
        assert!(set.is_empty());
        assert!(!set.has_scan_elements());
    }

    #[test]
    #[traced_test]
    fn test_unknown_ids_are_logged() {
        let set = ChannelSet::select(&device(), &["voltage0".to_string(), "voltage7".to_string()]);
        assert_eq!(set.len(), 1);
        assert!(logs_contain("voltage7"));
    }

    #[test]
    fn test_attribute_only_selection_has_no_scan_elements() {
        let set = ChannelSet::select(&device(), &["temp0".to_string()]);
        assert_eq!(set.len(), 1);
        assert!(!set.has_scan_elements());
    }
}
