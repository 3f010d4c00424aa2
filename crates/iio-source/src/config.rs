//! Source configuration.
//!
//! Field names follow snake_case; the original block parameter names
//! (`deviceId`, `channelIds`, `enablePorts`, `bufferSize`) are accepted as
//! aliases so existing flow-graph descriptions load unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceError};

/// Default number of scan rows obtained per refill.
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Default downstream port capacity, in multiples of the buffer size.
pub const DEFAULT_PORT_CAPACITY_FACTOR: usize = 4;

/// Configuration of one source instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Device identifier; empty creates an unconfigured placeholder
    #[serde(alias = "deviceId")]
    pub device_id: String,

    /// Channels to select; empty selects every input channel
    #[serde(alias = "channelIds")]
    pub channel_ids: Vec<String>,

    /// Create output streams and reserve the device buffer
    #[serde(alias = "enablePorts")]
    pub enable_ports: bool,

    /// Scan rows obtained from the device per refill
    #[serde(alias = "bufferSize")]
    pub buffer_size: usize,

    /// Capacity of each output stream in samples (default: 4 x buffer_size)
    #[serde(alias = "portCapacity")]
    pub port_capacity: Option<usize>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            channel_ids: Vec::new(),
            enable_ports: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
            port_capacity: None,
        }
    }
}

impl SourceConfig {
    /// Create a new builder.
    pub fn builder() -> SourceConfigBuilder {
        SourceConfigBuilder::default()
    }

    /// Whether a device has been chosen.
    pub fn is_configured(&self) -> bool {
        !self.device_id.is_empty()
    }

    /// Effective output stream capacity in samples.
    pub fn port_capacity(&self) -> usize {
        self.port_capacity
            .unwrap_or(self.buffer_size * DEFAULT_PORT_CAPACITY_FACTOR)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(SourceError::InvalidConfig {
                message: "buffer_size must be greater than 0".to_string(),
            });
        }

        if let Some(capacity) = self.port_capacity {
            if capacity < self.buffer_size {
                return Err(SourceError::InvalidConfig {
                    message: format!(
                        "port_capacity {} is smaller than buffer_size {}; no refill could ever fit",
                        capacity, self.buffer_size
                    ),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for id in &self.channel_ids {
            if id.is_empty() {
                return Err(SourceError::InvalidConfig {
                    message: "channel_ids contains an empty identifier".to_string(),
                });
            }
            if !seen.insert(id) {
                return Err(SourceError::InvalidConfig {
                    message: format!("Duplicate channel id: {}", id),
                });
            }
        }

        Ok(())
    }
}

/// Builder for [`SourceConfig`].
#[derive(Debug, Default)]
pub struct SourceConfigBuilder {
    config: SourceConfig,
}

impl SourceConfigBuilder {
    /// Set the device identifier.
    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.config.device_id = id.into();
        self
    }

    /// Set the channel allow-list.
    pub fn channel_ids(mut self, ids: &[&str]) -> Self {
        self.config.channel_ids = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Enable or disable output streams.
    pub fn enable_ports(mut self, enable: bool) -> Self {
        self.config.enable_ports = enable;
        self
    }

    /// Set the refill size in scan rows.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Set the output stream capacity in samples.
    pub fn port_capacity(mut self, capacity: usize) -> Self {
        self.config.port_capacity = Some(capacity);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<SourceConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
