//! Scan-row layout and per-channel demultiplexing.
//!
//! A refilled buffer holds consecutive scan rows. Each row contains one sample
//! of every enabled scan element, ordered by scan index, with every element
//! aligned to its own storage width. The row is padded to the widest element;
//! the padded row size is the buffer's `step`.

use tracing::warn;

use crate::error::{IioError, Result};
use crate::model::ChannelInfo;
use crate::DataType;

/// Position of one channel inside a scan row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanElement {
    /// Channel identifier
    pub channel: String,
    /// Byte offset from the start of the row
    pub offset: usize,
    /// Storage format
    pub data_type: DataType,
}

/// Byte layout of one scan row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanLayout {
    elements: Vec<ScanElement>,
    step: usize,
}

impl ScanLayout {
    /// Compute the layout for a set of enabled channels.
    ///
    /// Channels that are not scan elements are skipped, as are scan elements
    /// whose data type fails [`DataType::validate`].
    pub fn new<'a, I>(channels: I) -> Self
    where
        I: IntoIterator<Item = &'a ChannelInfo>,
    {
        let mut scan: Vec<&ChannelInfo> = channels
            .into_iter()
            .filter(|c| c.scan_element)
            .filter(|c| match c.data_type.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(channel = %c.id, error = %e, "Leaving channel out of scan layout");
                    false
                }
            })
            .collect();
        scan.sort_by_key(|c| c.index);

        let mut elements = Vec::with_capacity(scan.len());
        let mut offset = 0usize;
        let mut widest = 1usize;
        for channel in scan {
            let align = channel.data_type.element_bytes();
            widest = widest.max(align);
            offset = offset.next_multiple_of(align);
            elements.push(ScanElement {
                channel: channel.id.clone(),
                offset,
                data_type: channel.data_type,
            });
            offset += channel.data_type.sample_bytes();
        }

        let step = if elements.is_empty() {
            0
        } else {
            offset.next_multiple_of(widest)
        };

        Self { elements, step }
    }

    /// Bytes per scan row across all elements.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Elements in scan order.
    pub fn elements(&self) -> &[ScanElement] {
        &self.elements
    }

    /// Look up the element for a channel.
    pub fn element(&self, channel: &str) -> Option<&ScanElement> {
        self.elements.iter().find(|e| e.channel == channel)
    }

    /// True when no scan element is enabled.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Copy one channel's converted samples out of interleaved rows.
    ///
    /// Copies at most `sample_count` samples, limited by the rows present in
    /// `data` and the room in `dst`. Returns the number of bytes written.
    pub fn demux(
        &self,
        data: &[u8],
        device: &str,
        channel: &str,
        dst: &mut [u8],
        sample_count: usize,
    ) -> Result<usize> {
        let element = self
            .element(channel)
            .ok_or_else(|| IioError::ChannelNotFound {
                device: device.to_string(),
                channel: channel.to_string(),
            })?;

        if self.step == 0 {
            return Ok(0);
        }

        let width = element.data_type.sample_bytes();
        let rows = sample_count
            .min(data.len() / self.step)
            .min(dst.len() / width);

        for (row, out) in data
            .chunks_exact(self.step)
            .zip(dst.chunks_exact_mut(width))
            .take(rows)
        {
            let start = element.offset;
            element.data_type.convert(&row[start..start + width], out);
        }

        Ok(rows * width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str, index: u32, format: &str) -> ChannelInfo {
        ChannelInfo::scan_input(id, index, format.parse().unwrap())
    }

    #[test]
    fn test_step_for_two_int16_channels() {
        let channels = [
            channel("voltage0", 0, "le:s16/16>>0"),
            channel("voltage1", 1, "le:s16/16>>0"),
        ];
        let layout = ScanLayout::new(&channels);
        assert_eq!(layout.step(), 4);
        assert_eq!(layout.element("voltage1").unwrap().offset, 2);
    }

    #[test]
    fn test_alignment_and_padding() {
        let channels = [
            channel("voltage0", 0, "le:s16/16>>0"),
            channel("timestamp", 2, "le:s64/64>>0"),
            channel("voltage1", 1, "le:u8/8>>0"),
        ];
        let layout = ScanLayout::new(&channels);
        let order: Vec<_> = layout.elements().iter().map(|e| e.channel.as_str()).collect();
        assert_eq!(order, vec!["voltage0", "voltage1", "timestamp"]);
        assert_eq!(layout.element("voltage1").unwrap().offset, 2);
        assert_eq!(layout.element("timestamp").unwrap().offset, 8);
        assert_eq!(layout.step(), 16);
    }

    #[test]
    fn test_non_scan_channels_are_ignored() {
        let channels = [ChannelInfo::attribute_only(
            "temp0",
            crate::Direction::Input,
        )];
        let layout = ScanLayout::new(&channels);
        assert!(layout.is_empty());
        assert_eq!(layout.step(), 0);
    }

    #[test]
    fn test_demux_extracts_interleaved_channel() {
        let channels = [
            channel("voltage0", 0, "le:s16/16>>0"),
            channel("voltage1", 1, "le:s16/16>>0"),
        ];
        let layout = ScanLayout::new(&channels);

        let mut data = Vec::new();
        for row in 0..4i16 {
            data.extend_from_slice(&row.to_le_bytes());
            data.extend_from_slice(&(-row).to_le_bytes());
        }

        let mut out = [0u8; 8];
        let written = layout
            .demux(&data, "dev", "voltage1", &mut out, 4)
            .unwrap();
        assert_eq!(written, 8);
        let values: Vec<i16> = out
            .chunks_exact(2)
            .map(|b| i16::from_ne_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(values, vec![0, -1, -2, -3]);
    }

    #[test]
    fn test_demux_limits_to_destination() {
        let channels = [channel("voltage0", 0, "le:s16/16>>0")];
        let layout = ScanLayout::new(&channels);
        let data = vec![0u8; 16];
        let mut out = [0u8; 4];
        assert_eq!(layout.demux(&data, "dev", "voltage0", &mut out, 8).unwrap(), 4);
    }

    #[test]
    fn test_invalid_data_type_is_left_out() {
        let broken = DataType {
            storage_bits: 0,
            ..DataType::INT16
        };
        let channels = [
            channel("voltage0", 0, "le:s16/16>>0"),
            ChannelInfo::scan_input("voltage1", 1, broken),
        ];
        let layout = ScanLayout::new(&channels);
        assert_eq!(layout.elements().len(), 1);
        assert_eq!(layout.step(), 2);

        let err = layout
            .demux(&[0u8; 8], "dev", "voltage1", &mut [0u8; 8], 4)
            .unwrap_err();
        assert!(matches!(err, IioError::ChannelNotFound { .. }));
    }

    #[test]
    fn test_demux_unknown_channel() {
        let layout = ScanLayout::new(&[channel("voltage0", 0, "le:s16/16>>0")]);
        let err = layout
            .demux(&[], "dev", "voltage5", &mut [], 1)
            .unwrap_err();
        assert!(matches!(err, IioError::ChannelNotFound { .. }));
    }
}
