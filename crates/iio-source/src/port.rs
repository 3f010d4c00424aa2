//! Per-channel output streams.
//!
//! Each selected scan-element channel gets one [`OutputPort`] keyed by the
//! channel identifier and typed by its [`DataType`]. A port is a bounded
//! staging region: the engine writes converted samples into the free tail and
//! marks them produced; the downstream consumer takes them out. The set of
//! ports is fixed when the source is constructed.

use bytes::Bytes;
use iio_core::DataType;
use tracing::trace;

/// One output stream.
#[derive(Debug)]
pub struct OutputPort {
    name: String,
    data_type: DataType,
    capacity: usize,
    data: Vec<u8>,
    pending: usize,
    total_produced: u64,
}

impl OutputPort {
    /// Create a port holding up to `capacity` samples of `data_type`.
    pub fn new(name: impl Into<String>, data_type: DataType, capacity: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            capacity,
            data: vec![0u8; capacity * data_type.sample_bytes()],
            pending: 0,
            total_produced: 0,
        }
    }

    /// Port name (the channel identifier).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample type carried by the port.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Capacity in samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free space in samples.
    pub fn available(&self) -> usize {
        self.capacity - self.pending
    }

    /// Samples produced but not yet taken downstream.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Samples produced since construction.
    pub fn total_produced(&self) -> u64 {
        self.total_produced
    }

    /// Writable region for the next samples.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        let start = self.pending * self.data_type.sample_bytes();
        &mut self.data[start..]
    }

    /// Mark `samples` samples written to [`Self::buffer_mut`] as produced.
    ///
    /// Clamped to the free space.
    pub fn produce(&mut self, samples: usize) {
        let samples = samples.min(self.available());
        self.pending += samples;
        self.total_produced += samples as u64;
        trace!(port = %self.name, samples, pending = self.pending, "Produced samples");
    }

    /// Take every pending sample, freeing the port.
    pub fn take(&mut self) -> Bytes {
        let end = self.pending * self.data_type.sample_bytes();
        let out = Bytes::copy_from_slice(&self.data[..end]);
        self.pending = 0;
        out
    }
}

/// The fixed set of output streams of a source.
#[derive(Debug, Default)]
pub struct OutputPorts {
    ports: Vec<OutputPort>,
}

impl OutputPorts {
    pub(crate) fn new(ports: Vec<OutputPort>) -> Self {
        Self { ports }
    }

    /// Look up a port by name.
    pub fn get(&self, name: &str) -> Option<&OutputPort> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Look up a port by name for draining.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut OutputPort> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    /// Ports in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &OutputPort> {
        self.ports.iter()
    }

    /// Ports in registration order, mutable.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut OutputPort> {
        self.ports.iter_mut()
    }

    /// Port names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.ports.iter().map(|p| p.name.as_str()).collect()
    }

    /// Smallest free space across all ports, or `None` without ports.
    pub fn min_available(&self) -> Option<usize> {
        self.ports.iter().map(OutputPort::available).min()
    }

    /// Number of ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// True when the source has no output streams.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_produce_and_take() {
        let mut port = OutputPort::new("voltage0", DataType::INT16, 8);
        assert_eq!(port.available(), 8);

        port.buffer_mut()[..4].copy_from_slice(&[1, 0, 2, 0]);
        port.produce(2);
        assert_eq!(port.pending(), 2);
        assert_eq!(port.available(), 6);
        assert_eq!(port.buffer_mut().len(), 12);

        let taken = port.take();
        assert_eq!(&taken[..], &[1, 0, 2, 0]);
        assert_eq!(port.available(), 8);
        assert_eq!(port.total_produced(), 2);
    }

    #[test]
    fn test_produce_clamps_to_capacity() {
        let mut port = OutputPort::new("voltage0", DataType::INT16, 4);
        port.produce(10);
        assert_eq!(port.pending(), 4);
        assert_eq!(port.available(), 0);
        assert!(port.buffer_mut().is_empty());
    }

    #[test]
    fn test_min_available() {
        let mut ports = OutputPorts::new(vec![
            OutputPort::new("voltage0", DataType::INT16, 8),
            OutputPort::new("voltage1", DataType::INT16, 8),
        ]);
        ports.get_mut("voltage1").unwrap().produce(5);
        assert_eq!(ports.min_available(), Some(3));
        assert_eq!(ports.names(), vec!["voltage0", "voltage1"]);
        assert_eq!(OutputPorts::default().min_available(), None);
    }
}
