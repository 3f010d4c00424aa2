//! Streaming acquisition engine.
//!
//! The engine owns the capture buffer and turns each scheduler invocation into
//! at most one refill:
//!
//! 1. Skip the turn if any output stream lacks room for a full buffer.
//! 2. Wait on the buffer's readiness descriptor, bounded by the scheduler's
//!    timeout.
//! 3. Refill, check that a whole number of scan rows arrived, and hand every
//!    scan-element channel its slice of those rows.
//!
//! Every output stream advances by the same sample count in a cycle, so the
//! streams stay aligned. The engine spawns no threads; the bounded wait is the
//! only place it blocks.

use std::time::Duration;

use iio_core::{AcquisitionBuffer, DeviceHandle, Readiness};
use tracing::{debug, error, info, trace};

use crate::channel_set::ChannelSet;
use crate::config::SourceConfig;
use crate::error::{Result, SourceError};
use crate::port::OutputPorts;

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Not activated (initial and terminal)
    #[default]
    Idle,
    /// Activated; `work()` performs acquisition
    Armed,
    /// A fatal runtime error occurred; `work()` refuses to run
    Faulted,
}

/// What one `work()` invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// No buffer exists (attribute-only configuration or not armed)
    Idle,
    /// Downstream lacked room for a full buffer; nothing was polled
    Backpressure,
    /// The readiness wait timed out; the turn was yielded
    Yielded,
    /// A refill completed and every stream advanced by `samples`
    Produced {
        /// Samples produced on each stream
        samples: usize,
    },
}

/// Scheduler-supplied and port-derived limits for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkInfo {
    /// Smallest free space across the output streams, in samples
    pub min_out_elements: usize,
    /// Longest the invocation may block
    pub max_timeout: Duration,
}

/// Counters accumulated while streaming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Completed refills
    pub refills: u64,
    /// Bytes transferred by refills
    pub bytes_transferred: u64,
    /// Samples produced per stream
    pub samples_per_stream: u64,
    /// Turns that ended with a readiness timeout
    pub timeouts: u64,
    /// Turns skipped for lack of downstream room
    pub backpressure_turns: u64,
    /// Successful activations
    pub activations: u64,
}

/// Buffer lifecycle and refill/demultiplex loop.
pub struct StreamingEngine {
    device: Option<DeviceHandle>,
    channels: ChannelSet,
    enable_ports: bool,
    buffer_size: usize,
    outputs: OutputPorts,
    buffer: Option<Box<dyn AcquisitionBuffer>>,
    state: EngineState,
    stats: StreamStats,
}

impl StreamingEngine {
    /// Create an idle engine.
    pub fn new(
        device: Option<DeviceHandle>,
        channels: ChannelSet,
        config: &SourceConfig,
        outputs: OutputPorts,
    ) -> Self {
        Self {
            device,
            channels,
            enable_ports: config.enable_ports,
            buffer_size: config.buffer_size,
            outputs,
            buffer: None,
            state: EngineState::Idle,
            stats: StreamStats::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Whether a capture buffer is currently held.
    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    /// Capacity of the held buffer in scan rows.
    pub fn buffer_capacity(&self) -> Option<usize> {
        self.buffer.as_ref().map(|b| b.capacity())
    }

    /// Selected channels.
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Output streams.
    pub fn outputs(&self) -> &OutputPorts {
        &self.outputs
    }

    /// Output streams, for draining.
    pub fn outputs_mut(&mut self) -> &mut OutputPorts {
        &mut self.outputs
    }

    /// Streaming counters.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Enable the selected channels and, if streaming, reserve a buffer.
    ///
    /// Any buffer from a previous activation is released first, so changed
    /// settings always take effect. On failure the engine is left idle with
    /// no buffer.
    pub fn activate(&mut self) -> Result<()> {
        let device = self.device.clone().ok_or(SourceError::NotConfigured)?;

        if self.buffer.take().is_some() {
            debug!(device = %device.id(), "Released previous buffer before re-activation");
        }
        self.state = EngineState::Idle;

        for channel in self.channels.iter() {
            device.enable_channel(&channel.id)?;
        }

        if self.channels.has_scan_elements() && self.enable_ports {
            let allocation_failed = |source| SourceError::BufferAllocationFailed {
                device: device.id().to_string(),
                source,
            };
            let mut buffer = device
                .create_buffer(self.buffer_size, false)
                .map_err(allocation_failed)?;
            buffer.set_blocking_mode(false).map_err(allocation_failed)?;

            info!(
                device = %device.id(),
                buffer_size = self.buffer_size,
                step = buffer.step(),
                n_streams = self.outputs.len(),
                "Allocated acquisition buffer"
            );
            self.buffer = Some(buffer);
        }

        self.state = EngineState::Armed;
        self.stats.activations += 1;
        info!(
            device = %device.id(),
            n_channels = self.channels.len(),
            streaming = self.buffer.is_some(),
            "Activated IIO source"
        );
        Ok(())
    }

    /// Release the buffer. Safe to call in any state.
    pub fn deactivate(&mut self) {
        let released = self.buffer.take().is_some();
        if self.state != EngineState::Idle || released {
            info!(
                released_buffer = released,
                refills = self.stats.refills,
                samples = self.stats.samples_per_stream,
                "Deactivated IIO source"
            );
        }
        self.state = EngineState::Idle;
    }

    /// Run one scheduling turn, blocking for at most `max_timeout`.
    pub fn work(&mut self, max_timeout: Duration) -> Result<WorkOutcome> {
        if self.state == EngineState::Faulted {
            return Err(SourceError::EngineFaulted);
        }
        if self.buffer.is_none() {
            return Ok(WorkOutcome::Idle);
        }

        let info = WorkInfo {
            min_out_elements: self.outputs.min_available().unwrap_or(0),
            max_timeout,
        };
        if info.min_out_elements < self.buffer_size {
            self.stats.backpressure_turns += 1;
            trace!(
                min_out_elements = info.min_out_elements,
                buffer_size = self.buffer_size,
                "Not enough downstream space for a refill"
            );
            return Ok(WorkOutcome::Backpressure);
        }

        match self.refill_cycle(info) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(error = %err, "Fatal streaming error; releasing buffer");
                self.buffer = None;
                self.state = EngineState::Faulted;
                Err(err)
            }
        }
    }

    fn refill_cycle(&mut self, info: WorkInfo) -> Result<WorkOutcome> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(WorkOutcome::Idle);
        };

        match buffer.wait_ready(info.max_timeout) {
            Err(e) => return Err(SourceError::PollFailed(e)),
            Ok(Readiness::TimedOut) => {
                self.stats.timeouts += 1;
                return Ok(WorkOutcome::Yielded);
            }
            Ok(Readiness::Ready) => {}
        }

        let bytes = buffer.refill()?;
        let step = buffer.step();
        if step == 0 || bytes % step != 0 {
            return Err(SourceError::RefillInvariantViolation { bytes, step });
        }
        let sample_count = bytes / step;

        for channel in self.channels.scan_elements() {
            let Some(port) = self.outputs.get_mut(&channel.id) else {
                continue;
            };
            let expected = sample_count * channel.data_type.sample_bytes();
            let actual = buffer.read_channel(&channel.id, port.buffer_mut(), sample_count)?;
            if actual != expected {
                return Err(SourceError::ChannelReadMismatch {
                    channel: channel.id.clone(),
                    expected,
                    actual,
                });
            }
        }

        // Commit only once every channel has been read
        for channel in self.channels.scan_elements() {
            if let Some(port) = self.outputs.get_mut(&channel.id) {
                port.produce(sample_count);
            }
        }

        self.stats.refills += 1;
        self.stats.bytes_transferred += bytes as u64;
        self.stats.samples_per_stream += sample_count as u64;
        debug!(bytes, step, sample_count, "Refilled acquisition buffer");

        Ok(WorkOutcome::Produced {
            samples: sample_count,
        })
    }
}

impl std::fmt::Debug for StreamingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingEngine")
            .field("device", &self.device.as_ref().map(|d| d.id().to_string()))
            .field("state", &self.state)
            .field("buffer_size", &self.buffer_size)
            .field("has_buffer", &self.buffer.is_some())
            .field("outputs", &self.outputs.names())
            .finish()
    }
}

impl Drop for StreamingEngine {
    fn drop(&mut self) {
        if self.buffer.is_some() {
            self.deactivate();
        }
    }
}
