//! Single-threaded cooperative host scheduler.
//!
//! Drives one [`IioSource`] the way a flow-graph runtime would: activate,
//! invoke `work()` once per turn with a bounded timeout, drain every output
//! stream into a [`SampleSink`], and deactivate on every exit path.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use iio_source::{IioSource, StreamStats, WorkOutcome};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::AppResult;
use crate::sink::SampleSink;

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Turns executed
    pub turns: u64,
    /// Turns that produced samples
    pub produced_turns: u64,
    /// Turns skipped for lack of downstream room
    pub backpressure_turns: u64,
    /// Turns that timed out waiting for data
    pub yielded_turns: u64,
    /// Samples delivered to the sink, per stream
    pub samples: BTreeMap<String, u64>,
    /// Engine counters at the end of the run
    pub stats: StreamStats,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Samples delivered on the busiest stream.
    pub fn samples_per_stream(&self) -> u64 {
        self.samples.values().copied().max().unwrap_or(0)
    }
}

/// Drives a source for a fixed number of turns.
#[derive(Debug, Clone)]
pub struct Scheduler {
    max_timeout: Duration,
    turns: u64,
}

impl Scheduler {
    /// Create a scheduler from configuration.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            max_timeout: config.max_timeout(),
            turns: config.turns,
        }
    }

    /// Per-turn timeout.
    pub fn max_timeout(&self) -> Duration {
        self.max_timeout
    }

    /// Run the source to completion.
    ///
    /// Stops early when the source has nothing to stream. The source is
    /// deactivated before returning, whether the run succeeded or not.
    pub fn run(&self, source: &mut IioSource, sink: &mut dyn SampleSink) -> AppResult<RunSummary> {
        let started = Instant::now();
        source.activate()?;

        let result = self.run_turns(source, sink);
        source.deactivate();

        let mut summary = result?;
        sink.finish()?;
        summary.stats = source.stats().clone();
        summary.elapsed = started.elapsed();

        info!(
            turns = summary.turns,
            produced = summary.produced_turns,
            backpressure = summary.backpressure_turns,
            yielded = summary.yielded_turns,
            samples_per_stream = summary.samples_per_stream(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Run finished"
        );
        Ok(summary)
    }

    fn run_turns(&self, source: &mut IioSource, sink: &mut dyn SampleSink) -> AppResult<RunSummary> {
        let mut summary = RunSummary::default();

        for turn in 0..self.turns {
            let outcome = source.work(self.max_timeout)?;
            summary.turns += 1;

            match outcome {
                WorkOutcome::Idle => {
                    info!("Source has no streams to drive; stopping");
                    break;
                }
                WorkOutcome::Backpressure => summary.backpressure_turns += 1,
                WorkOutcome::Yielded => {
                    summary.yielded_turns += 1;
                    debug!(turn, "No data before timeout");
                }
                WorkOutcome::Produced { samples } => {
                    summary.produced_turns += 1;
                    debug!(turn, samples, "Produced samples");
                }
            }

            drain(source, sink, &mut summary.samples)?;
        }

        if summary.turns > 0 && summary.produced_turns == 0 && summary.yielded_turns > 0 {
            warn!(turns = summary.turns, "Source never produced samples");
        }
        Ok(summary)
    }
}

/// Move every pending sample of every output stream into the sink.
pub fn drain(
    source: &mut IioSource,
    sink: &mut dyn SampleSink,
    delivered: &mut BTreeMap<String, u64>,
) -> AppResult<()> {
    for port in source.outputs_mut().iter_mut() {
        let pending = port.pending();
        if pending == 0 {
            continue;
        }
        let name = port.name().to_string();
        let data_type = port.data_type();
        let samples = port.take();
        sink.consume(&name, data_type, samples)?;
        *delivered.entry(name).or_default() += pending as u64;
    }
    Ok(())
}
