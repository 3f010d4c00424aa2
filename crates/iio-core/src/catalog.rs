//! Read-only device catalog.
//!
//! A [`Catalog`] enumerates the backend once and then answers lookups from
//! memory. Build it once at startup and share it (`Arc<Catalog>`) with every
//! component that needs discovery; dropping the last reference tears it down.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::attribute::{AttrKey, AttrOwner};
use crate::backend::{AcquisitionBuffer, IioBackend};
use crate::error::{IioError, Result};
use crate::model::DeviceInfo;

/// Snapshot of the devices reachable through a backend.
pub struct Catalog {
    backend: Arc<dyn IioBackend>,
    devices: Vec<Arc<DeviceInfo>>,
}

impl Catalog {
    /// Enumerate the backend. No hardware state is modified.
    pub fn new(backend: Arc<dyn IioBackend>) -> Result<Self> {
        let devices: Vec<Arc<DeviceInfo>> = backend
            .devices()?
            .into_iter()
            .map(Arc::new)
            .collect();

        info!(
            backend = backend.name(),
            n_devices = devices.len(),
            "Built device catalog"
        );
        for device in &devices {
            debug!(
                id = %device.id,
                name = %device.name,
                n_channels = device.channels.len(),
                n_attributes = device.attributes.len(),
                "Discovered device"
            );
        }

        Ok(Self { backend, devices })
    }

    /// Backend the catalog was built from.
    pub fn backend(&self) -> &Arc<dyn IioBackend> {
        &self.backend
    }

    /// Iterate the discovered devices. Each call starts from the first device.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceInfo> + '_ {
        self.devices.iter().map(|d| d.as_ref())
    }

    /// Number of discovered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True when no device was discovered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Resolve a device identifier to a handle.
    pub fn resolve(&self, device_id: &str) -> Result<DeviceHandle> {
        self.devices
            .iter()
            .find(|d| d.id == device_id)
            .map(|info| DeviceHandle {
                info: Arc::clone(info),
                backend: Arc::clone(&self.backend),
            })
            .ok_or_else(|| IioError::DeviceNotFound {
                id: device_id.to_string(),
            })
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("backend", &self.backend.name())
            .field(
                "devices",
                &self.devices.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A resolved device.
#[derive(Clone)]
pub struct DeviceHandle {
    info: Arc<DeviceInfo>,
    backend: Arc<dyn IioBackend>,
}

impl DeviceHandle {
    /// Discovery record.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Device identifier.
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Backend serving this device.
    pub fn backend(&self) -> &Arc<dyn IioBackend> {
        &self.backend
    }

    /// Enable a channel for buffered capture.
    pub fn enable_channel(&self, channel: &str) -> Result<()> {
        self.check_channel(channel)?;
        self.backend.enable_channel(&self.info.id, channel)
    }

    /// Disable a channel.
    pub fn disable_channel(&self, channel: &str) -> Result<()> {
        self.check_channel(channel)?;
        self.backend.disable_channel(&self.info.id, channel)
    }

    /// Query a channel's enable state.
    pub fn is_channel_enabled(&self, channel: &str) -> Result<bool> {
        self.check_channel(channel)?;
        self.backend.is_channel_enabled(&self.info.id, channel)
    }

    /// Reserve a capture buffer.
    pub fn create_buffer(
        &self,
        sample_capacity: usize,
        cyclic: bool,
    ) -> Result<Box<dyn AcquisitionBuffer>> {
        self.backend
            .create_buffer(&self.info.id, sample_capacity, cyclic)
    }

    /// Read a device-level attribute.
    pub fn attribute(&self, name: &str) -> Result<String> {
        self.backend
            .read_attribute(&AttrKey::new(AttrOwner::device(&self.info.id), name))
    }

    /// Write a device-level attribute.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        self.backend
            .write_attribute(&AttrKey::new(AttrOwner::device(&self.info.id), name), value)
    }

    fn check_channel(&self, channel: &str) -> Result<()> {
        if self.info.channel(channel).is_none() {
            return Err(IioError::ChannelNotFound {
                device: self.info.id.clone(),
                channel: channel.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.info.id)
            .field("name", &self.info.name)
            .finish()
    }
}
