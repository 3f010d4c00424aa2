//! Named attribute access.
//!
//! Every device and channel carries string-valued attributes (`sampling_frequency`,
//! `scale`, `hardwaregain`, ...). An attribute refers to its owner only by
//! identifier ([`AttrOwner`]); the owner is resolved by the backend on each
//! access, so attribute records never keep a device or channel alive.
//!
//! [`AttributeRegistry`] maps `(owner, name)` to an accessor. It is built once
//! from discovery data and then serves `get`, `set` and `probe` by lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::backend::IioBackend;
use crate::error::{IioError, Result};
use crate::model::{ChannelInfo, DeviceInfo};

/// Entity an attribute belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrOwner {
    /// Device-level attribute
    Device {
        /// Device identifier
        device: String,
    },
    /// Channel-level attribute
    Channel {
        /// Device identifier
        device: String,
        /// Channel identifier
        channel: String,
    },
}

impl AttrOwner {
    /// Owner reference for a device.
    pub fn device(device: impl Into<String>) -> Self {
        Self::Device {
            device: device.into(),
        }
    }

    /// Owner reference for a channel of a device.
    pub fn channel(device: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::Channel {
            device: device.into(),
            channel: channel.into(),
        }
    }

    /// Identifier of the device the owner lives on.
    pub fn device_id(&self) -> &str {
        match self {
            Self::Device { device } | Self::Channel { device, .. } => device,
        }
    }
}

/// Lookup key for one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrKey {
    /// Owning entity
    pub owner: AttrOwner,
    /// Attribute name
    pub name: String,
}

impl AttrKey {
    /// Create a key.
    pub fn new(owner: AttrOwner, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }

    /// Conventional name of the setter operation for this attribute.
    pub fn setter_name(&self) -> String {
        match &self.owner {
            // Lowercase `d` matches the name hosts already register
            AttrOwner::Device { .. } => format!("setdeviceAttribute[{}]", self.name),
            AttrOwner::Channel { channel, .. } => {
                format!("setChannelAttribute[{}][{}]", channel, self.name)
            }
        }
    }
}

/// Displays as the conventional getter/probe name, e.g. `channelAttribute[voltage0][scale]`.
impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            AttrOwner::Device { .. } => write!(f, "deviceAttribute[{}]", self.name),
            AttrOwner::Channel { channel, .. } => {
                write!(f, "channelAttribute[{}][{}]", channel, self.name)
            }
        }
    }
}

/// Value observed by a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReading {
    /// Attribute that was read
    pub key: AttrKey,
    /// Value returned by the device
    pub value: String,
    /// When the value was read
    pub timestamp: DateTime<Utc>,
}

/// Accessor for one registered attribute.
pub struct Attribute<'a> {
    key: &'a AttrKey,
    backend: &'a dyn IioBackend,
}

impl Attribute<'_> {
    /// Key of the attribute.
    pub fn key(&self) -> &AttrKey {
        self.key
    }

    /// Read the current value from the device.
    pub fn get(&self) -> Result<String> {
        let value = self.backend.read_attribute(self.key)?;
        trace!(attribute = %self.key, value = %value, "Read attribute");
        Ok(value)
    }

    /// Write a new value to the device.
    pub fn set(&self, value: &str) -> Result<()> {
        self.backend.write_attribute(self.key, value)?;
        debug!(attribute = %self.key, value = %value, "Wrote attribute");
        Ok(())
    }
}

/// Registry of the attributes exposed by one source instance.
pub struct AttributeRegistry {
    backend: Arc<dyn IioBackend>,
    keys: Vec<AttrKey>,
    index: HashMap<AttrKey, usize>,
}

impl AttributeRegistry {
    /// Create an empty registry over a backend.
    pub fn new(backend: Arc<dyn IioBackend>) -> Self {
        Self {
            backend,
            keys: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register one attribute. Registering the same key twice is a no-op.
    pub fn register(&mut self, key: AttrKey) {
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
    }

    /// Register every device-level attribute.
    pub fn register_device(&mut self, device: &DeviceInfo) {
        for name in &device.attributes {
            self.register(AttrKey::new(AttrOwner::device(&device.id), name));
        }
    }

    /// Register every attribute of a channel.
    pub fn register_channel(&mut self, device_id: &str, channel: &ChannelInfo) {
        for name in &channel.attributes {
            self.register(AttrKey::new(
                AttrOwner::channel(device_id, &channel.id),
                name,
            ));
        }
    }

    /// Registered keys, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &AttrKey> {
        self.keys.iter()
    }

    /// Number of registered attributes.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// True if the key is registered.
    pub fn contains(&self, key: &AttrKey) -> bool {
        self.index.contains_key(key)
    }

    /// Resolve a key to its accessor.
    pub fn attribute(&self, key: &AttrKey) -> Result<Attribute<'_>> {
        let slot = self
            .index
            .get(key)
            .copied()
            .ok_or_else(|| IioError::AttributeNotFound { key: key.clone() })?;
        Ok(Attribute {
            key: &self.keys[slot],
            backend: self.backend.as_ref(),
        })
    }

    /// Read an attribute.
    pub fn get(&self, key: &AttrKey) -> Result<String> {
        self.attribute(key)?.get()
    }

    /// Write an attribute.
    pub fn set(&self, key: &AttrKey, value: &str) -> Result<()> {
        self.attribute(key)?.set(value)
    }

    /// Read an attribute and timestamp the observation.
    pub fn probe(&self, key: &AttrKey) -> Result<ProbeReading> {
        let value = self.get(key)?;
        Ok(ProbeReading {
            key: key.clone(),
            value,
            timestamp: Utc::now(),
        })
    }
}

impl fmt::Debug for AttributeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeRegistry")
            .field("backend", &self.backend.name())
            .field("keys", &self.keys)
            .finish()
    }
}
