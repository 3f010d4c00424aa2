//! Streaming source block for IIO-style data-acquisition devices.
//!
//! An [`IioSource`] forwards the selected input channels of one device to
//! independent per-channel output streams:
//!
//! - [`ChannelSet`] - Which channels a source streams
//! - [`StreamingEngine`] - Buffer lifecycle, readiness wait, refill and demux
//! - [`OutputPorts`] - Fixed set of per-channel output streams
//! - [`IioSourceFactory`] - Construction from TOML configuration
//!
//! Attribute access goes through the [`iio_core::AttributeRegistry`] built
//! with the source and is independent of the streaming state.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --activate()--> Armed --work()...--> Armed --deactivate()--> Idle
//!                        |
//!                        +--fatal work() error--> Faulted --deactivate()--> Idle
//! ```
//!
//! `work()` never blocks longer than the timeout it is given and never spawns
//! threads; a host scheduler calls it repeatedly from a single thread.

pub mod channel_set;
pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod overlay;
pub mod port;
pub mod source;

pub use channel_set::ChannelSet;
pub use config::{SourceConfig, SourceConfigBuilder, DEFAULT_BUFFER_SIZE};
pub use engine::{EngineState, StreamStats, StreamingEngine, WorkInfo, WorkOutcome};
pub use error::{Result, SourceError};
pub use factory::{BlockFactory, IioSourceFactory, REGISTRY_PATH};
pub use overlay::device_overlay;
pub use port::{OutputPort, OutputPorts};
pub use source::IioSource;
