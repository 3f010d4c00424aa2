//! Application error type.
//!
//! [`AppError`] collects the failures the host side can hit: loading or
//! validating configuration, running a source, and writing captured samples.
//! Library errors from `iio-core` and `iio-source` convert into it with `?`.

use iio_core::IioError;
use iio_source::SourceError;
use thiserror::Error;

/// Result alias for host-side operations.
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Errors raised by the host application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be read or merged
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] Box<figment::Error>),

    /// Configuration loaded but holds an invalid value
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Logging could not be initialized
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Device catalog or attribute failure
    #[error(transparent)]
    Device(#[from] IioError),

    /// Streaming source failure
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Sample sink I/O failure
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}
