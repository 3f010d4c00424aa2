//! Error types for device-access operations.
//!
//! Every fallible operation exposed by the catalog, the attribute registry and
//! the backend traits returns [`IioError`]. Backends map their native failure
//! codes onto these variants so the streaming layer can classify them without
//! knowing which transport produced them.

use thiserror::Error;

use crate::attribute::AttrKey;

/// Result type alias for device-access operations.
pub type Result<T> = std::result::Result<T, IioError>;

/// Errors that can occur when talking to an IIO-style device.
#[derive(Error, Debug)]
pub enum IioError {
    /// No device with the given identifier exists in the catalog
    #[error("Device '{id}' not found")]
    DeviceNotFound { id: String },

    /// The device has no channel with the given identifier
    #[error("Channel '{channel}' not found on device '{device}'")]
    ChannelNotFound { device: String, channel: String },

    /// No attribute registered under the given key
    #[error("Attribute {key} not found")]
    AttributeNotFound { key: AttrKey },

    /// Reading or writing an attribute failed on the device side
    #[error("Attribute {key} access failed: {message}")]
    AttributeAccess { key: AttrKey, message: String },

    /// The device buffer is already reserved by another owner
    #[error("Device '{device}' is busy (buffer already reserved)")]
    DeviceBusy { device: String },

    /// Buffer could not be created for another reason
    #[error("Buffer allocation on device '{device}' failed: {message}")]
    BufferAllocation { device: String, message: String },

    /// A data-format descriptor could not be parsed or is inconsistent
    #[error("Invalid data format '{format}': {message}")]
    InvalidDataFormat { format: String, message: String },

    /// I/O error from the operating system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure
    #[error("Backend error: {message}")]
    Backend { message: String },
}

impl IioError {
    /// Check if this is a "device not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound { .. })
    }

    /// Check if the device is busy.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::DeviceBusy { .. })
    }
}
