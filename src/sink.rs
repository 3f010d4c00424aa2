//! Downstream consumers of per-channel sample streams.
//!
//! After every scheduling turn the [`Scheduler`](crate::scheduler::Scheduler)
//! takes the pending samples of each output stream and hands them to a
//! [`SampleSink`] together with the stream's sample type.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use iio_core::DataType;
use tracing::{debug, info};

/// Consumer of drained output-stream data.
pub trait SampleSink {
    /// Accept converted samples drained from the stream `port`.
    fn consume(&mut self, port: &str, data_type: DataType, samples: Bytes) -> io::Result<()>;

    /// Flush buffered data. Called once after the run.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Per-stream totals kept by [`CountingSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortTotals {
    /// Samples received
    pub samples: u64,
    /// Bytes received
    pub bytes: u64,
    /// Number of deliveries
    pub chunks: u64,
}

/// Counts what each stream delivered and discards the data.
#[derive(Debug, Default)]
pub struct CountingSink {
    totals: BTreeMap<String, PortTotals>,
}

impl CountingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals per stream, ordered by stream name.
    pub fn totals(&self) -> &BTreeMap<String, PortTotals> {
        &self.totals
    }

    /// Totals of one stream.
    pub fn port(&self, name: &str) -> Option<PortTotals> {
        self.totals.get(name).copied()
    }
}

impl SampleSink for CountingSink {
    fn consume(&mut self, port: &str, data_type: DataType, samples: Bytes) -> io::Result<()> {
        let entry = self.totals.entry(port.to_string()).or_default();
        let width = data_type.sample_bytes().max(1);
        entry.samples += (samples.len() / width) as u64;
        entry.bytes += samples.len() as u64;
        entry.chunks += 1;
        Ok(())
    }
}

/// Appends raw converted samples to `<dir>/<port>.bin`.
///
/// Samples are written in host byte order, `sample_bytes()` per sample, with
/// no header. Files are truncated when first opened by this sink.
#[derive(Debug)]
pub struct RawFileSink {
    dir: PathBuf,
    files: HashMap<String, BufWriter<File>>,
    bytes_written: u64,
}

impl RawFileSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Writing raw channel captures");
        Ok(Self {
            dir,
            files: HashMap::new(),
            bytes_written: 0,
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the capture file for `port`.
    pub fn path_for(&self, port: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", port))
    }

    /// Total bytes written across all files.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl SampleSink for RawFileSink {
    fn consume(&mut self, port: &str, _data_type: DataType, samples: Bytes) -> io::Result<()> {
        if !self.files.contains_key(port) {
            let path = self.path_for(port);
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)?;
            debug!(port, path = %path.display(), "Opened capture file");
            self.files.insert(port.to_string(), BufWriter::new(file));
        }

        if let Some(writer) = self.files.get_mut(port) {
            writer.write_all(&samples)?;
            self.bytes_written += samples.len() as u64;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        for writer in self.files.values_mut() {
            writer.flush()?;
        }
        debug!(bytes = self.bytes_written, "Flushed capture files");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_sink() {
        let mut sink = CountingSink::new();
        sink.consume("voltage0", DataType::INT16, Bytes::from_static(&[0; 8]))
            .unwrap();
        sink.consume("voltage0", DataType::INT16, Bytes::from_static(&[0; 4]))
            .unwrap();

        let totals = sink.port("voltage0").unwrap();
        assert_eq!(totals.samples, 6);
        assert_eq!(totals.bytes, 12);
        assert_eq!(totals.chunks, 2);
        assert!(sink.port("voltage1").is_none());
    }

    #[test]
    fn test_raw_file_sink_appends_per_port() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RawFileSink::new(dir.path().join("capture")).unwrap();

        sink.consume("voltage0", DataType::INT16, Bytes::from_static(&[1, 0, 2, 0]))
            .unwrap();
        sink.consume("voltage1", DataType::INT16, Bytes::from_static(&[9, 0]))
            .unwrap();
        sink.consume("voltage0", DataType::INT16, Bytes::from_static(&[3, 0]))
            .unwrap();
        sink.finish().unwrap();

        let v0 = fs::read(sink.path_for("voltage0")).unwrap();
        let v1 = fs::read(sink.path_for("voltage1")).unwrap();
        assert_eq!(v0, vec![1, 0, 2, 0, 3, 0]);
        assert_eq!(v1, vec![9, 0]);
        assert_eq!(sink.bytes_written(), 8);
    }
}
