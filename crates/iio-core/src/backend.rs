//! Device-access collaborator traits.
//!
//! A backend wraps whatever actually talks to the hardware (libiio, a network
//! daemon, or the in-memory simulator). The streaming layer only ever sees
//! these two traits.

use std::io;
use std::os::fd::BorrowedFd;
use std::time::Duration;

use crate::attribute::AttrKey;
use crate::error::Result;
use crate::model::DeviceInfo;
use crate::readiness::{self, Readiness};

/// Access to a set of devices.
///
/// Attribute reads and writes are independent synchronous round trips; the
/// backend performs no batching.
pub trait IioBackend: Send + Sync {
    /// Short backend name for logs (e.g. `sim`, `local`).
    fn name(&self) -> &str;

    /// Enumerate devices. Called once when a catalog is built.
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Read an attribute value.
    fn read_attribute(&self, key: &AttrKey) -> Result<String>;

    /// Write an attribute value.
    fn write_attribute(&self, key: &AttrKey, value: &str) -> Result<()>;

    /// Enable a channel for buffered capture. Enabling twice is a no-op.
    fn enable_channel(&self, device: &str, channel: &str) -> Result<()>;

    /// Disable a channel.
    fn disable_channel(&self, device: &str, channel: &str) -> Result<()>;

    /// Query whether a channel is enabled.
    fn is_channel_enabled(&self, device: &str, channel: &str) -> Result<bool>;

    /// Reserve a capture buffer of `sample_capacity` scan rows.
    ///
    /// The layout is fixed from the channels enabled at this moment.
    fn create_buffer(
        &self,
        device: &str,
        sample_capacity: usize,
        cyclic: bool,
    ) -> Result<Box<dyn AcquisitionBuffer>>;
}

/// A reserved capture buffer.
///
/// Dropping the buffer releases the reservation on the device.
pub trait AcquisitionBuffer: Send {
    /// Identifier of the device the buffer was created on.
    fn device_id(&self) -> &str;

    /// Capacity in scan rows.
    fn capacity(&self) -> usize;

    /// Descriptor that becomes readable when a refill will not block.
    fn readiness_fd(&self) -> BorrowedFd<'_>;

    /// Switch between blocking and non-blocking refills.
    fn set_blocking_mode(&mut self, blocking: bool) -> Result<()>;

    /// Bytes per scan row across all enabled scan elements.
    fn step(&self) -> usize;

    /// Transfer newly captured rows into the buffer, returning the byte count.
    fn refill(&mut self) -> Result<usize>;

    /// Copy one channel's converted samples from the last refill into `dst`.
    ///
    /// Returns the number of bytes written.
    fn read_channel(&self, channel: &str, dst: &mut [u8], sample_count: usize) -> Result<usize>;

    /// Wait until the readiness descriptor signals data, for at most `timeout`.
    fn wait_ready(&self, timeout: Duration) -> io::Result<Readiness> {
        readiness::wait_readable(self.readiness_fd(), timeout)
    }
}
