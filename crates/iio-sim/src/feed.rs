//! Sample feed driving a simulated buffer.
//!
//! The feed plays the role of the ADC: it appends scan rows to a queue and
//! makes the buffer's readiness descriptor readable. Tests push rows by hand;
//! demos start a [`SampleClock`] thread that pushes rows at a fixed rate.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use iio_core::{DataType, Endianness, ScanLayout};

/// Value the pattern generator stores for `channel_slot` at `row`.
///
/// Every channel carries a ramp offset by `1000 * slot`, truncated to the
/// channel's significant bits, so tests can check alignment across channels.
pub fn pattern_value(row: u64, channel_slot: usize) -> i64 {
    row as i64 + 1000 * channel_slot as i64
}

/// Encode a value into the stored representation of `dtype`.
pub fn encode(dtype: &DataType, value: i64, out: &mut [u8]) {
    let width = dtype.element_bytes();
    let mask = if dtype.bits >= 64 {
        u64::MAX
    } else {
        (1u64 << dtype.bits) - 1
    };
    let stored = ((value as u64) & mask) << dtype.shift;
    for element in out.chunks_exact_mut(width).take(usize::from(dtype.repeat)) {
        for (i, byte) in element.iter_mut().enumerate() {
            let shift = match dtype.endianness {
                Endianness::Little => 8 * i,
                Endianness::Big => 8 * (width - 1 - i),
            };
            *byte = (stored >> shift) as u8;
        }
    }
}

/// Injected failure for the next read of one channel.
#[derive(Debug, Clone)]
pub(crate) enum ReadFault {
    Fail(String),
    Truncate(usize),
}

#[derive(Debug, Default)]
pub(crate) struct FeedQueue {
    pub(crate) bytes: VecDeque<u8>,
    pub(crate) next_row: u64,
    pub(crate) wait_error: Option<io::ErrorKind>,
    pub(crate) refill_error: Option<String>,
    pub(crate) read_faults: HashMap<String, ReadFault>,
}

#[derive(Debug)]
pub(crate) struct FeedShared {
    pub(crate) layout: ScanLayout,
    pub(crate) queue: Mutex<FeedQueue>,
    writer: Mutex<UnixStream>,
}

impl FeedShared {
    pub(crate) fn new(layout: ScanLayout, writer: UnixStream) -> Self {
        Self {
            layout,
            queue: Mutex::new(FeedQueue::default()),
            writer: Mutex::new(writer),
        }
    }

    /// Make the readiness descriptor readable.
    pub(crate) fn notify(&self) {
        if let Err(e) = self.writer.lock().write_all(&[1]) {
            warn!(error = %e, "Failed to signal simulated readiness");
        }
    }
}

/// Producer side of a simulated buffer.
#[derive(Debug, Clone)]
pub struct SimFeed {
    shared: Arc<FeedShared>,
}

impl SimFeed {
    pub(crate) fn new(shared: Arc<FeedShared>) -> Self {
        Self { shared }
    }

    /// Bytes per scan row of the buffer this feed drives.
    pub fn step(&self) -> usize {
        self.shared.layout.step()
    }

    /// Scan layout of the buffer this feed drives.
    pub fn layout(&self) -> &ScanLayout {
        &self.shared.layout
    }

    /// Total rows generated so far.
    pub fn rows_generated(&self) -> u64 {
        self.shared.queue.lock().next_row
    }

    /// Bytes waiting to be refilled.
    pub fn pending_bytes(&self) -> usize {
        self.shared.queue.lock().bytes.len()
    }

    /// Append `rows` pattern rows and signal readiness.
    pub fn push_rows(&self, rows: usize) {
        let layout = &self.shared.layout;
        let step = layout.step();
        if step == 0 || rows == 0 {
            return;
        }

        let mut row_bytes = vec![0u8; step];
        {
            let mut queue = self.shared.queue.lock();
            for _ in 0..rows {
                row_bytes.fill(0);
                for (slot, element) in layout.elements().iter().enumerate() {
                    let width = element.data_type.sample_bytes();
                    encode(
                        &element.data_type,
                        pattern_value(queue.next_row, slot),
                        &mut row_bytes[element.offset..element.offset + width],
                    );
                }
                queue.bytes.extend(row_bytes.iter().copied());
                queue.next_row += 1;
            }
            trace!(rows, pending = queue.bytes.len(), "Pushed simulated rows");
        }
        self.shared.notify();
    }

    /// Append raw bytes (possibly a partial row) and signal readiness.
    pub fn push_raw(&self, bytes: &[u8]) {
        self.shared.queue.lock().bytes.extend(bytes.iter().copied());
        self.shared.notify();
    }

    /// Make the next readiness wait fail with `kind`.
    pub fn fail_next_wait(&self, kind: io::ErrorKind) {
        self.shared.queue.lock().wait_error = Some(kind);
    }

    /// Make the next refill fail with a backend error.
    pub fn fail_next_refill(&self, message: impl Into<String>) {
        self.shared.queue.lock().refill_error = Some(message.into());
        self.shared.notify();
    }

    /// Make the next read of `channel` fail with a backend error.
    pub fn fail_next_read(&self, channel: &str, message: impl Into<String>) {
        self.shared
            .queue
            .lock()
            .read_faults
            .insert(channel.to_string(), ReadFault::Fail(message.into()));
    }

    /// Make the next read of `channel` return at most `samples` samples.
    pub fn truncate_next_read(&self, channel: &str, samples: usize) {
        self.shared
            .queue
            .lock()
            .read_faults
            .insert(channel.to_string(), ReadFault::Truncate(samples));
    }

    /// Start a thread that pushes `rows_per_tick` rows every `interval`.
    pub fn start_clock(&self, rows_per_tick: usize, interval: Duration) -> SampleClock {
        let running = Arc::new(AtomicBool::new(true));
        let feed = self.clone();
        let flag = Arc::clone(&running);
        let handle = std::thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                feed.push_rows(rows_per_tick);
                std::thread::sleep(interval);
            }
        });
        debug!(
            rows_per_tick,
            interval_us = interval.as_micros() as u64,
            "Started simulated sample clock"
        );
        SampleClock {
            running,
            handle: Some(handle),
        }
    }
}

/// Background sample generator; stops when dropped.
#[derive(Debug)]
pub struct SampleClock {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SampleClock {
    /// Stop generating and wait for the thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Simulated sample clock thread panicked");
            }
        }
    }
}

impl Drop for SampleClock {
    fn drop(&mut self) {
        self.shutdown();
    }
}
