//! Simulated capture buffer.

use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use iio_core::{wait_readable, AcquisitionBuffer, IioError, Readiness, Result};

use crate::backend::SimState;
use crate::feed::{FeedShared, ReadFault, SampleClock};

/// Buffer handed out by [`crate::SimBackend::create_buffer`].
///
/// Holds the device reservation until dropped.
pub struct SimBuffer {
    device: String,
    capacity: usize,
    cyclic: bool,
    blocking: bool,
    reader: UnixStream,
    data: Vec<u8>,
    feed: Arc<FeedShared>,
    state: Arc<Mutex<SimState>>,
    clock: Option<SampleClock>,
}

impl SimBuffer {
    pub(crate) fn new(
        device: String,
        capacity: usize,
        cyclic: bool,
        reader: UnixStream,
        feed: Arc<FeedShared>,
        state: Arc<Mutex<SimState>>,
    ) -> Result<Self> {
        reader.set_nonblocking(true)?;
        Ok(Self {
            device,
            capacity,
            cyclic,
            blocking: true,
            reader,
            data: Vec::new(),
            feed,
            state,
            clock: None,
        })
    }

    /// Whether the buffer was created cyclic.
    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    /// Whether refills block until data arrives.
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Whether a free-running sample clock feeds this buffer.
    pub fn has_clock(&self) -> bool {
        self.clock.is_some()
    }

    pub(crate) fn attach_clock(&mut self, clock: SampleClock) {
        self.clock = Some(clock);
    }

    /// Consume pending readiness notifications.
    fn drain_notifications(&mut self) -> Result<()> {
        let mut scratch = [0u8; 64];
        loop {
            match self.reader.read(&mut scratch) {
                Ok(0) => return Ok(()),
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl AcquisitionBuffer for SimBuffer {
    fn device_id(&self) -> &str {
        &self.device
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn readiness_fd(&self) -> BorrowedFd<'_> {
        self.reader.as_fd()
    }

    fn set_blocking_mode(&mut self, blocking: bool) -> Result<()> {
        self.blocking = blocking;
        Ok(())
    }

    fn step(&self) -> usize {
        self.feed.layout.step()
    }

    fn refill(&mut self) -> Result<usize> {
        if self.blocking {
            while self.feed.queue.lock().bytes.is_empty() {
                wait_readable(self.readiness_fd(), Duration::from_millis(100))?;
                self.drain_notifications()?;
            }
        }
        self.drain_notifications()?;

        let mut queue = self.feed.queue.lock();
        if let Some(message) = queue.refill_error.take() {
            return Err(IioError::Backend { message });
        }

        let max_bytes = self.capacity * self.feed.layout.step();
        let take = queue.bytes.len().min(max_bytes);
        self.data.clear();
        self.data.extend(queue.bytes.drain(..take));
        let remaining = queue.bytes.len();
        drop(queue);

        if remaining > 0 {
            self.feed.notify();
        }

        trace!(device = %self.device, bytes = take, remaining, "Refilled simulated buffer");
        Ok(take)
    }

    fn read_channel(&self, channel: &str, dst: &mut [u8], sample_count: usize) -> Result<usize> {
        let fault = self.feed.queue.lock().read_faults.remove(channel);
        let sample_count = match fault {
            Some(ReadFault::Fail(message)) => return Err(IioError::Backend { message }),
            Some(ReadFault::Truncate(samples)) => sample_count.min(samples),
            None => sample_count,
        };
        self.feed
            .layout
            .demux(&self.data, &self.device, channel, dst, sample_count)
    }

    fn wait_ready(&self, timeout: Duration) -> io::Result<Readiness> {
        if let Some(kind) = self.feed.queue.lock().wait_error.take() {
            return Err(io::Error::new(kind, "injected readiness failure"));
        }
        wait_readable(self.readiness_fd(), timeout)
    }
}

impl Drop for SimBuffer {
    fn drop(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.stop();
        }
        self.state.lock().release(&self.device);
        debug!(device = %self.device, "Released simulated buffer");
    }
}
