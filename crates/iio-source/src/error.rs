//! Error types for the streaming source.
//!
//! Construction and activation errors abort setup without leaving a buffer
//! reserved. Errors raised from `work()` are fatal to the engine instance: the
//! buffer is released and every later `work()` call returns
//! [`SourceError::EngineFaulted`] until the source is deactivated and
//! activated again.

use iio_core::IioError;
use thiserror::Error;

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors raised by the streaming source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Configured device identifier matches no catalog entry
    #[error("Device '{id}' not found")]
    DeviceNotFound { id: String },

    /// `activate()` called on a source without a device
    #[error("No device specified")]
    NotConfigured,

    /// The backend could not reserve a capture buffer
    #[error("Buffer creation on device '{device}' failed: {source}")]
    BufferAllocationFailed {
        device: String,
        #[source]
        source: IioError,
    },

    /// The readiness wait itself failed
    #[error("Readiness wait failed: {0}")]
    PollFailed(#[source] std::io::Error),

    /// A refill returned a byte count that is not a whole number of scan rows
    #[error("Refill returned {bytes} bytes, not a multiple of the {step}-byte scan step")]
    RefillInvariantViolation { bytes: usize, step: usize },

    /// A channel read produced a different amount of data than the refill held
    #[error("Channel '{channel}' produced {actual} bytes, expected {expected}")]
    ChannelReadMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },

    /// `work()` called after a fatal runtime error
    #[error("Engine stopped after a fatal error; deactivate and re-activate to recover")]
    EngineFaulted,

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Device-access failure
    #[error(transparent)]
    Backend(#[from] IioError),
}

impl SourceError {
    /// Check if this is a "device not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound { .. })
    }

    /// Check if buffer allocation failed because the device is already reserved.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::BufferAllocationFailed { source, .. } if source.is_busy())
    }

    /// Check if this error stops the engine when raised from `work()`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PollFailed(_)
                | Self::RefillInvariantViolation { .. }
                | Self::ChannelReadMismatch { .. }
                | Self::EngineFaulted
                | Self::Backend(_)
        )
    }

    /// Check if this error can only come from the configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. } | Self::NotConfigured | Self::InvalidConfig { .. }
        )
    }
}
