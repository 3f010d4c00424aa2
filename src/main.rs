//! CLI entry point for iio-stream
//!
//! Provides a command-line interface for:
//! - Listing the devices of the (simulated) catalog
//! - Reading and writing device and channel attributes
//! - Printing the `deviceId` editor overlay
//! - Streaming a source into counting or raw-file sinks
//!
//! # Usage
//!
//! ```bash
//! iio-stream list
//! iio-stream attr get iio:device0 calib_mode
//! iio-stream attr set iio:device0 hardwaregain 30 --channel voltage0
//! iio-stream stream --config config/iio-stream.toml --turns 200
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iio_core::{AttrKey, AttrOwner, AttributeRegistry, Catalog};
use iio_source::{device_overlay, IioSource};
use iio_stream::config::{AppConfig, DEFAULT_CONFIG_PATH};
use iio_stream::scheduler::Scheduler;
use iio_stream::sink::{CountingSink, RawFileSink, SampleSink};
use iio_stream::{build_catalog, logging, simulated_backend};
use tracing::info;

#[derive(Parser)]
#[command(name = "iio-stream")]
#[command(about = "Stream IIO device channels into per-channel sample streams", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List devices, channels and attributes
    List,

    /// Read or write an attribute
    Attr {
        #[command(subcommand)]
        action: AttrAction,
    },

    /// Print the deviceId drop-down overlay as JSON
    Overlay,

    /// Stream the configured source
    Stream {
        /// Number of scheduling turns (overrides the configuration)
        #[arg(long)]
        turns: Option<u64>,

        /// Device identifier (overrides the configuration)
        #[arg(long)]
        device: Option<String>,

        /// Directory for raw per-channel captures (overrides the configuration)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AttrAction {
    /// Read an attribute
    Get {
        /// Device identifier
        device: String,
        /// Attribute name
        name: String,
        /// Channel identifier for channel attributes
        #[arg(long)]
        channel: Option<String>,
    },
    /// Write an attribute
    Set {
        /// Device identifier
        device: String,
        /// Attribute name
        name: String,
        /// New value
        value: String,
        /// Channel identifier for channel attributes
        #[arg(long)]
        channel: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    config.validate().context("Invalid configuration")?;
    logging::init_from_config(&config)?;

    let backend = simulated_backend(&config.simulation);
    let catalog = build_catalog(backend)?;

    match cli.command {
        Commands::List => list_devices(&catalog),
        Commands::Attr { action } => attribute(&catalog, action),
        Commands::Overlay => {
            println!("{}", serde_json::to_string_pretty(&device_overlay(&catalog))?);
            Ok(())
        }
        Commands::Stream {
            turns,
            device,
            output,
        } => stream(catalog, config, turns, device, output),
    }
}

fn list_devices(catalog: &Catalog) -> Result<()> {
    for device in catalog.devices() {
        println!("{}", device.label());
        if !device.attributes.is_empty() {
            println!("  attributes: {}", device.attributes.join(", "));
        }
        for channel in &device.channels {
            let kind = if channel.scan_element {
                format!("scan[{}] {}", channel.index, channel.data_type)
            } else {
                "attributes only".to_string()
            };
            let name = channel
                .name
                .as_deref()
                .map(|n| format!(" ({})", n))
                .unwrap_or_default();
            println!(
                "  {:<12} {:<6} {}{}",
                channel.id,
                format!("{:?}", channel.direction).to_lowercase(),
                kind,
                name
            );
            if !channel.attributes.is_empty() {
                println!("      attributes: {}", channel.attributes.join(", "));
            }
        }
    }
    Ok(())
}

fn attribute(catalog: &Catalog, action: AttrAction) -> Result<()> {
    let (device_id, name, channel) = match &action {
        AttrAction::Get {
            device,
            name,
            channel,
        }
        | AttrAction::Set {
            device,
            name,
            channel,
            ..
        } => (device, name, channel),
    };

    let device = catalog.resolve(device_id)?;
    let mut registry = AttributeRegistry::new(Arc::clone(catalog.backend()));
    registry.register_device(device.info());
    for ch in &device.info().channels {
        registry.register_channel(device.id(), ch);
    }

    let owner = match channel {
        Some(channel) => AttrOwner::channel(device.id(), channel),
        None => AttrOwner::device(device.id()),
    };
    let key = AttrKey::new(owner, name.as_str());

    match &action {
        AttrAction::Get { .. } => {
            let reading = registry.probe(&key)?;
            println!("{} = {}", reading.key, reading.value);
        }
        AttrAction::Set { value, .. } => {
            registry.set(&key, value)?;
            println!("{} <- {}", key.setter_name(), value);
        }
    }
    Ok(())
}

fn stream(
    catalog: Arc<Catalog>,
    mut config: AppConfig,
    turns: Option<u64>,
    device: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    if let Some(turns) = turns {
        config.scheduler.turns = turns;
    }
    if let Some(device) = device {
        config.source.device_id = device;
    }
    if output.is_some() {
        config.output.directory = output;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        app = %config.application.name,
        device = %config.source.device_id,
        turns = config.scheduler.turns,
        "Starting stream"
    );

    let mut source = IioSource::new(catalog, config.source.clone())
        .context("Failed to create IIO source")?;
    let scheduler = Scheduler::new(&config.scheduler);

    let mut sink: Box<dyn SampleSink> = match &config.output.directory {
        Some(dir) => Box::new(RawFileSink::new(dir)?),
        None => Box::new(CountingSink::new()),
    };
    let summary = scheduler.run(&mut source, sink.as_mut())?;

    println!(
        "{} turns: {} produced, {} backpressure, {} timed out ({:.1?})",
        summary.turns,
        summary.produced_turns,
        summary.backpressure_turns,
        summary.yielded_turns,
        summary.elapsed
    );
    for (port, samples) in &summary.samples {
        println!("  {:<12} {} samples", port, samples);
    }
    if let Some(dir) = &config.output.directory {
        println!("Raw captures written to {}", dir.display());
    }
    Ok(())
}
