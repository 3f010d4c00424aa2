//! The source block.

use std::sync::Arc;
use std::time::Duration;

use iio_core::{
    AttrKey, AttrOwner, AttributeRegistry, Catalog, IioError, ProbeReading,
};
use tracing::{debug, info};

use crate::channel_set::ChannelSet;
use crate::config::SourceConfig;
use crate::engine::{EngineState, StreamStats, StreamingEngine, WorkOutcome};
use crate::error::{Result, SourceError};
use crate::overlay;
use crate::port::{OutputPort, OutputPorts};

/// Streams the selected channels of one IIO device to per-channel outputs.
///
/// Construction resolves the device, selects channels, creates one output
/// stream per selected scan-element channel and registers the attribute
/// accessors. Nothing touches the hardware until [`IioSource::activate`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use iio_core::Catalog;
/// use iio_source::{IioSource, SourceConfig};
///
/// let backend = Arc::new(iio_sim::demo_backend());
/// let catalog = Arc::new(Catalog::new(backend.clone()).unwrap());
/// let config = SourceConfig::builder()
///     .device_id("iio:device0")
///     .buffer_size(256)
///     .build()
///     .unwrap();
///
/// let mut source = IioSource::new(catalog, config).unwrap();
/// source.activate().unwrap();
/// backend.feed("iio:device0").unwrap().push_rows(256);
/// source.work(Duration::from_millis(100)).unwrap();
/// assert_eq!(source.outputs().get("voltage0").unwrap().pending(), 256);
/// source.deactivate();
/// ```
pub struct IioSource {
    catalog: Arc<Catalog>,
    config: SourceConfig,
    attributes: AttributeRegistry,
    engine: StreamingEngine,
}

impl IioSource {
    /// Build a source from a shared catalog.
    ///
    /// An empty `device_id` yields an unconfigured placeholder with no
    /// channels, outputs or attributes; its `activate()` fails with
    /// [`SourceError::NotConfigured`].
    pub fn new(catalog: Arc<Catalog>, config: SourceConfig) -> Result<Self> {
        config.validate()?;
        let mut attributes = AttributeRegistry::new(Arc::clone(catalog.backend()));

        if !config.is_configured() {
            debug!("Creating unconfigured IIO source placeholder");
            let engine =
                StreamingEngine::new(None, ChannelSet::default(), &config, OutputPorts::default());
            return Ok(Self {
                catalog,
                config,
                attributes,
                engine,
            });
        }

        let device = catalog.resolve(&config.device_id).map_err(|e| match e {
            IioError::DeviceNotFound { id } => SourceError::DeviceNotFound { id },
            other => SourceError::Backend(other),
        })?;

        let channels = ChannelSet::select(device.info(), &config.channel_ids);

        let mut ports = Vec::new();
        if config.enable_ports {
            for channel in channels.scan_elements() {
                ports.push(OutputPort::new(
                    channel.id.clone(),
                    channel.data_type,
                    config.port_capacity(),
                ));
            }
        }

        attributes.register_device(device.info());
        for channel in channels.iter() {
            attributes.register_channel(device.id(), channel);
        }

        info!(
            device = %device.info().label(),
            n_channels = channels.len(),
            n_outputs = ports.len(),
            n_attributes = attributes.len(),
            "Created IIO source"
        );

        let engine = StreamingEngine::new(Some(device), channels, &config, OutputPorts::new(ports));
        Ok(Self {
            catalog,
            config,
            attributes,
            engine,
        })
    }

    /// Configuration the source was built with.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Selected channels.
    pub fn channels(&self) -> &ChannelSet {
        self.engine.channels()
    }

    /// Engine lifecycle state.
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    /// Streaming counters.
    pub fn stats(&self) -> &StreamStats {
        self.engine.stats()
    }

    /// Whether a capture buffer is currently held.
    pub fn is_streaming(&self) -> bool {
        self.engine.has_buffer()
    }

    /// Capacity of the held buffer in scan rows.
    pub fn buffer_capacity(&self) -> Option<usize> {
        self.engine.buffer_capacity()
    }

    /// Enable channels and reserve the capture buffer.
    pub fn activate(&mut self) -> Result<()> {
        self.engine.activate()
    }

    /// Release the capture buffer. Idempotent.
    pub fn deactivate(&mut self) {
        self.engine.deactivate()
    }

    /// Run one scheduling turn, blocking for at most `max_timeout`.
    pub fn work(&mut self, max_timeout: Duration) -> Result<WorkOutcome> {
        self.engine.work(max_timeout)
    }

    /// Output streams.
    pub fn outputs(&self) -> &OutputPorts {
        self.engine.outputs()
    }

    /// Output streams, for draining.
    pub fn outputs_mut(&mut self) -> &mut OutputPorts {
        self.engine.outputs_mut()
    }

    /// Registered attribute accessors.
    pub fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    /// Key of a device attribute of this source's device.
    pub fn device_attribute(&self, name: &str) -> AttrKey {
        AttrKey::new(AttrOwner::device(&self.config.device_id), name)
    }

    /// Key of a channel attribute of this source's device.
    pub fn channel_attribute(&self, channel: &str, name: &str) -> AttrKey {
        AttrKey::new(AttrOwner::channel(&self.config.device_id, channel), name)
    }

    /// Read a registered attribute.
    pub fn get_attribute(&self, key: &AttrKey) -> Result<String> {
        Ok(self.attributes.get(key)?)
    }

    /// Write a registered attribute.
    pub fn set_attribute(&self, key: &AttrKey, value: &str) -> Result<()> {
        Ok(self.attributes.set(key, value)?)
    }

    /// Read a registered attribute with an observation timestamp.
    pub fn probe_attribute(&self, key: &AttrKey) -> Result<ProbeReading> {
        Ok(self.attributes.probe(key)?)
    }

    /// Editor overlay listing the catalog's devices.
    pub fn overlay(&self) -> serde_json::Value {
        overlay::device_overlay(&self.catalog)
    }
}

impl std::fmt::Debug for IioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IioSource")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("attributes", &self.attributes.len())
            .finish()
    }
}
