//! Core types for IIO-style data-acquisition devices.
//!
//! This crate holds everything the streaming source needs to know about a
//! device without depending on any particular transport:
//!
//! - [`DeviceInfo`] / [`ChannelInfo`] - Immutable discovery records
//! - [`DataType`] - Sample storage format (`le:s12/16>>4`) and conversion
//! - [`ScanLayout`] - Scan-row layout and per-channel demultiplexing
//! - [`IioBackend`] / [`AcquisitionBuffer`] - Device-access collaborator traits
//! - [`Catalog`] - Read-only device catalog, built once and shared
//! - [`AttributeRegistry`] - Lookup-based attribute get/set/probe
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use iio_core::{Catalog, IioBackend};
//!
//! # fn example(backend: Arc<dyn IioBackend>) -> iio_core::Result<()> {
//! let catalog = Catalog::new(backend)?;
//! for device in catalog.devices() {
//!     println!("{}", device.label());
//! }
//! let phy = catalog.resolve("iio:device0")?;
//! println!("{} channels", phy.info().channels.len());
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod backend;
pub mod catalog;
pub mod data_type;
pub mod error;
pub mod layout;
pub mod model;
pub mod readiness;

pub use attribute::{AttrKey, AttrOwner, Attribute, AttributeRegistry, ProbeReading};
pub use backend::{AcquisitionBuffer, IioBackend};
pub use catalog::{Catalog, DeviceHandle};
pub use data_type::{DataType, Endianness};
pub use error::{IioError, Result};
pub use layout::{ScanElement, ScanLayout};
pub use model::{ChannelInfo, DeviceInfo, Direction};
pub use readiness::{wait_readable, Readiness};
