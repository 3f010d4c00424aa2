//! In-memory implementation of [`IioBackend`].

use std::collections::{HashMap, HashSet};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use iio_core::{
    AcquisitionBuffer, AttrKey, AttrOwner, DeviceInfo, IioBackend, IioError, Result, ScanLayout,
};

use crate::buffer::SimBuffer;
use crate::feed::{FeedShared, SimFeed};

/// Mutable device state shared between the backend and its buffers.
#[derive(Debug, Default)]
pub(crate) struct SimState {
    values: HashMap<AttrKey, String>,
    read_only: HashSet<AttrKey>,
    enabled: HashSet<(String, String)>,
    reserved: HashSet<String>,
    feeds: HashMap<String, SimFeed>,
    fail_allocation: HashSet<String>,
    allocations: HashMap<String, usize>,
    clock: Option<(usize, Duration)>,
}

impl SimState {
    pub(crate) fn release(&mut self, device: &str) {
        self.reserved.remove(device);
    }
}

/// Simulated device-access backend.
///
/// Attribute values live in memory (unset attributes read as `"0"`), channel
/// enable state is tracked per device, and every created buffer is driven by
/// a [`SimFeed`] retrievable through [`SimBackend::feed`]. Like the kernel, a
/// device accepts a single buffer reservation at a time.
#[derive(Debug)]
pub struct SimBackend {
    devices: Vec<DeviceInfo>,
    state: Arc<Mutex<SimState>>,
}

impl SimBackend {
    /// Create a backend serving the given devices.
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        info!(n_devices = devices.len(), "Created simulated IIO backend");
        Self {
            devices,
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Seed an attribute value.
    pub fn with_value(self, key: AttrKey, value: impl Into<String>) -> Self {
        self.state.lock().values.insert(key, value.into());
        self
    }

    /// Mark an attribute read-only; writes fail with [`IioError::AttributeAccess`].
    pub fn with_read_only(self, key: AttrKey) -> Self {
        self.state.lock().read_only.insert(key);
        self
    }

    /// Drive every buffer created from now on with a free-running sample clock
    /// pushing `rows_per_tick` rows every `interval`, until the buffer is dropped.
    pub fn with_sample_clock(self, rows_per_tick: usize, interval: Duration) -> Self {
        self.state.lock().clock = Some((rows_per_tick, interval));
        self
    }

    /// Feed of the most recent buffer created on `device`.
    pub fn feed(&self, device: &str) -> Option<SimFeed> {
        self.state.lock().feeds.get(device).cloned()
    }

    /// Whether a buffer is currently reserved on `device`.
    pub fn is_reserved(&self, device: &str) -> bool {
        self.state.lock().reserved.contains(device)
    }

    /// Number of buffers created on `device` so far.
    pub fn allocation_count(&self, device: &str) -> usize {
        self.state.lock().allocations.get(device).copied().unwrap_or(0)
    }

    /// Make the next buffer allocation on `device` fail.
    pub fn fail_next_allocation(&self, device: &str) {
        self.state.lock().fail_allocation.insert(device.to_string());
    }

    fn device(&self, id: &str) -> Result<&DeviceInfo> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| IioError::DeviceNotFound { id: id.to_string() })
    }

    fn check_key(&self, key: &AttrKey) -> Result<()> {
        let device = self.device(key.owner.device_id())?;
        let known = match &key.owner {
            AttrOwner::Device { .. } => device.attributes.contains(&key.name),
            AttrOwner::Channel { channel, .. } => device
                .channel(channel)
                .is_some_and(|c| c.attributes.contains(&key.name)),
        };
        if known {
            Ok(())
        } else {
            Err(IioError::AttributeNotFound { key: key.clone() })
        }
    }

    fn check_channel(&self, device: &str, channel: &str) -> Result<()> {
        if self.device(device)?.channel(channel).is_none() {
            return Err(IioError::ChannelNotFound {
                device: device.to_string(),
                channel: channel.to_string(),
            });
        }
        Ok(())
    }
}

impl IioBackend for SimBackend {
    fn name(&self) -> &str {
        "sim"
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.devices.clone())
    }

    fn read_attribute(&self, key: &AttrKey) -> Result<String> {
        self.check_key(key)?;
        Ok(self
            .state
            .lock()
            .values
            .get(key)
            .cloned()
            .unwrap_or_else(|| "0".to_string()))
    }

    fn write_attribute(&self, key: &AttrKey, value: &str) -> Result<()> {
        self.check_key(key)?;
        let mut state = self.state.lock();
        if state.read_only.contains(key) {
            return Err(IioError::AttributeAccess {
                key: key.clone(),
                message: "attribute is read-only".to_string(),
            });
        }
        state.values.insert(key.clone(), value.to_string());
        Ok(())
    }

    fn enable_channel(&self, device: &str, channel: &str) -> Result<()> {
        self.check_channel(device, channel)?;
        self.state
            .lock()
            .enabled
            .insert((device.to_string(), channel.to_string()));
        Ok(())
    }

    fn disable_channel(&self, device: &str, channel: &str) -> Result<()> {
        self.check_channel(device, channel)?;
        self.state
            .lock()
            .enabled
            .remove(&(device.to_string(), channel.to_string()));
        Ok(())
    }

    fn is_channel_enabled(&self, device: &str, channel: &str) -> Result<bool> {
        self.check_channel(device, channel)?;
        Ok(self
            .state
            .lock()
            .enabled
            .contains(&(device.to_string(), channel.to_string())))
    }

    fn create_buffer(
        &self,
        device: &str,
        sample_capacity: usize,
        cyclic: bool,
    ) -> Result<Box<dyn AcquisitionBuffer>> {
        let info = self.device(device)?;
        let mut state = self.state.lock();

        if state.fail_allocation.remove(device) {
            return Err(IioError::BufferAllocation {
                device: device.to_string(),
                message: "injected allocation failure".to_string(),
            });
        }
        if state.reserved.contains(device) {
            return Err(IioError::DeviceBusy {
                device: device.to_string(),
            });
        }
        if sample_capacity == 0 {
            return Err(IioError::BufferAllocation {
                device: device.to_string(),
                message: "sample capacity must be positive".to_string(),
            });
        }

        let layout = ScanLayout::new(info.channels.iter().filter(|c| {
            c.is_input() && state.enabled.contains(&(device.to_string(), c.id.clone()))
        }));
        if layout.is_empty() {
            return Err(IioError::BufferAllocation {
                device: device.to_string(),
                message: "no scan elements enabled".to_string(),
            });
        }

        let (reader, writer) = UnixStream::pair()?;
        let feed = Arc::new(FeedShared::new(layout, writer));
        let mut buffer = SimBuffer::new(
            device.to_string(),
            sample_capacity,
            cyclic,
            reader,
            Arc::clone(&feed),
            Arc::clone(&self.state),
        )?;
        let sim_feed = SimFeed::new(feed);
        if let Some((rows_per_tick, interval)) = state.clock {
            buffer.attach_clock(sim_feed.start_clock(rows_per_tick, interval));
        }

        state.reserved.insert(device.to_string());
        state.feeds.insert(device.to_string(), sim_feed);
        *state.allocations.entry(device.to_string()).or_default() += 1;

        debug!(
            device,
            sample_capacity,
            step = buffer.step(),
            "Created simulated buffer"
        );
        Ok(Box::new(buffer))
    }
}
