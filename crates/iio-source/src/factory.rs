//! Registry-compatible factory for IIO sources.
//!
//! Lets a host build sources from TOML configuration tables instead of
//! calling [`IioSource::new`] directly.
//!
//! # Example Configuration
//!
//! ```toml
//! [[blocks]]
//! id = "rx"
//! type = "iio_source"
//!
//! [blocks.config]
//! device_id = "iio:device0"
//! channel_ids = ["voltage0", "voltage1"]
//! buffer_size = 1024
//! ```

use std::sync::Arc;

use iio_core::Catalog;
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::{Result, SourceError};
use crate::source::IioSource;

/// Registry path of the source block.
pub const REGISTRY_PATH: &str = "/iio/source";

/// Builds blocks of one type from configuration tables.
pub trait BlockFactory: Send + Sync {
    /// Configuration `type` string handled by this factory.
    fn driver_type(&self) -> &'static str;

    /// Human-readable block name.
    fn name(&self) -> &'static str;

    /// Path the block is registered under in a flow-graph registry.
    fn registry_path(&self) -> &'static str;

    /// Check a configuration table without touching any device.
    fn validate(&self, config: &toml::Value) -> Result<()>;

    /// Build a block against a shared catalog.
    fn build(&self, catalog: Arc<Catalog>, config: toml::Value) -> Result<IioSource>;
}

/// Factory for [`IioSource`] blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct IioSourceFactory;

fn parse(config: toml::Value) -> Result<SourceConfig> {
    config.try_into().map_err(|e: toml::de::Error| SourceError::InvalidConfig {
        message: format!("Invalid IIO source config: {}", e.message()),
    })
}

impl BlockFactory for IioSourceFactory {
    fn driver_type(&self) -> &'static str {
        "iio_source"
    }

    fn name(&self) -> &'static str {
        "IIO Source"
    }

    fn registry_path(&self) -> &'static str {
        REGISTRY_PATH
    }

    fn validate(&self, config: &toml::Value) -> Result<()> {
        parse(config.clone())?.validate()
    }

    fn build(&self, catalog: Arc<Catalog>, config: toml::Value) -> Result<IioSource> {
        let cfg = parse(config)?;
        debug!(device_id = %cfg.device_id, "Building IIO source from configuration");
        IioSource::new(catalog, cfg)
    }
}
