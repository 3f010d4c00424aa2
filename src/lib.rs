//! # iio-stream
//!
//! Host application around the [`iio_source::IioSource`] block. The library
//! half holds everything the `iio-stream` binary needs so it can be tested
//! without spawning a process:
//!
//! - **`config`**: Figment-based [`AppConfig`](config::AppConfig) loaded from
//!   TOML and `IIO_STREAM_*` environment variables.
//! - **`logging`**: `tracing-subscriber` initialization (pretty, compact, JSON).
//! - **`scheduler`**: Single-threaded cooperative driver that activates a
//!   source, runs `work()` turns and drains the output streams.
//! - **`sink`**: Consumers for drained samples (counting, raw files).
//! - **`error`**: [`AppError`], the application error type.
//!
//! Devices come from the simulated backend (`iio-sim`); the device catalog is
//! built once per process and shared by `Arc`.

pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod sink;

use std::sync::Arc;

use iio_core::Catalog;
use iio_sim::SimBackend;

pub use error::{AppError, AppResult};

use crate::config::SimulationConfig;

/// Build the simulated backend described by the configuration.
///
/// Buffers created on it are fed by a free-running sample clock at the
/// configured rate.
pub fn simulated_backend(simulation: &SimulationConfig) -> Arc<SimBackend> {
    let backend = simulation
        .backend
        .clone()
        .into_backend()
        .with_sample_clock(simulation.rows_per_tick, simulation.tick_interval());
    Arc::new(backend)
}

/// Enumerate a backend into a shared catalog.
pub fn build_catalog(backend: Arc<SimBackend>) -> AppResult<Arc<Catalog>> {
    Ok(Arc::new(Catalog::new(backend)?))
}
