//! Simulated IIO backend for testing and demos without hardware.
//!
//! [`SimBackend`] implements [`iio_core::IioBackend`] entirely in memory:
//!
//! - Attribute values are stored in a map, with optional read-only keys
//! - Channel enable state is tracked per device
//! - Buffers are [`SimBuffer`]s whose readiness descriptor is one end of a
//!   Unix socket pair, so readiness waits go through a real `ppoll`
//! - Each buffer is driven by a [`SimFeed`] that pushes pattern rows and can
//!   inject faults (failed waits, failed refills, partial scans)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use iio_core::Catalog;
//! use iio_sim::demo_backend;
//!
//! let backend = Arc::new(demo_backend());
//! let catalog = Catalog::new(backend.clone()).unwrap();
//! assert!(catalog.resolve("iio:device0").is_ok());
//! ```

pub mod backend;
pub mod buffer;
pub mod demo;
pub mod feed;

pub use backend::SimBackend;
pub use buffer::SimBuffer;
pub use demo::{demo_backend, housekeeping_adc, transceiver, SimConfig, SimDeviceConfig};
pub use feed::{encode, pattern_value, SampleClock, SimFeed};
