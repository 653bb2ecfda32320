//! Tablet driver entry point.
//!
//! Loads the configuration, opens every tablet, builds the device registry
//! and runs the event loop on the Tokio runtime until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! tablet-driver [CONFIG] [--set DEVICE:PROPERTY=VALUE]...
//! ```
//!
//! `CONFIG` defaults to `$TABLET_DRIVER_CONFIG`, then the platform config
//! file.  Each `--set` changes one device property before the first report
//! is processed, e.g. `--set "pen:PressCurve=0 10 90 100"`.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config / to_layout / to_spec
//!  └─ open_transport (one per path)  ── failure: link unusable, logged once
//!  └─ build_registry
//!  └─ spawn_reader (one thread per open link)
//!  └─ run_event_loop (owns DriverContext, delivers to LogSink)
//! ```

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tablet_driver::application::manage_devices::{build_registry, LinkSetup};
use tablet_driver::application::process_samples::{run_event_loop, DriverContext};
use tablet_driver::application::update_properties::set_property;
use tablet_driver::infrastructure::host::LogSink;
use tablet_driver::infrastructure::storage::config;
use tablet_driver::infrastructure::transport::{open_transport, reader::spawn_reader, Transport};

/// Capacity of the report channel shared by all reader threads.
const CHANNEL_CAPACITY: usize = 256;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// One `--set DEVICE:PROPERTY=VALUE` argument.
#[derive(Debug, Clone, PartialEq)]
struct PropertyOverride {
    device: String,
    property: String,
    value: String,
}

fn parse_override(arg: &str) -> Result<PropertyOverride, String> {
    let (device, rest) = arg
        .split_once(':')
        .ok_or_else(|| format!("'{arg}': missing ':' after the device name"))?;
    let (property, value) = rest
        .split_once('=')
        .ok_or_else(|| format!("'{arg}': missing '=' before the value"))?;
    Ok(PropertyOverride {
        device: device.to_string(),
        property: property.to_string(),
        value: value.to_string(),
    })
}

/// Pen tablet input driver.
#[derive(Debug, Parser)]
#[command(name = "tablet-driver", about = "Pen tablet input driver", version)]
struct Cli {
    /// Configuration file.  Defaults to the platform config file.
    #[arg(env = "TABLET_DRIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Change a device property before the first report is processed.
    #[arg(long = "set", value_name = "DEVICE:PROPERTY=VALUE", value_parser = parse_override)]
    overrides: Vec<PropertyOverride>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => config::load_config().context("loading platform config")?,
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.driver.log_level)),
        )
        .init();

    info!("tablet driver starting");

    let mut layout = cfg.display.to_layout().context("display layout")?;
    let specs = cfg
        .devices
        .iter()
        .map(|d| d.to_spec())
        .collect::<Result<Vec<_>, _>>()?;

    // ── Open one transport per distinct path ──────────────────────────────────
    let mut setups: Vec<LinkSetup> = Vec::new();
    let mut transports: Vec<(String, Box<dyn Transport>)> = Vec::new();
    for spec in &specs {
        if setups.iter().any(|s| s.path == spec.path) {
            continue;
        }
        let capabilities = match open_transport(Path::new(&spec.path)) {
            Ok(transport) => {
                let caps = transport.descriptor().capabilities();
                transports.push((spec.path.clone(), transport));
                Some(caps)
            }
            Err(e) => {
                error!(path = %spec.path, "failed to open tablet: {e}");
                None
            }
        };
        setups.push(LinkSetup {
            path: spec.path.clone(),
            capabilities,
        });
    }

    let mut registry = build_registry(&specs, &setups, &cfg.driver.link_settings())?;
    info!(devices = registry.device_count(), links = setups.len(), "registry built");

    for o in &cli.overrides {
        let Some(id) = registry.find_by_name(&o.device).map(|d| d.id()) else {
            warn!(device = %o.device, "--set names an unknown device");
            continue;
        };
        set_property(&mut registry, &mut layout, id, &o.property, &o.value)
            .with_context(|| format!("--set {}:{}={}", o.device, o.property, o.value))?;
    }

    // Shutdown flag shared by the readers and the event loop.
    let running = Arc::new(AtomicBool::new(true));
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

    // ── Reader threads ────────────────────────────────────────────────────────
    let mut readers = Vec::new();
    for (path, transport) in transports {
        readers.push(spawn_reader(path, transport, tx.clone(), Arc::clone(&running))?);
    }
    // Only the readers hold senders; the loop ends when all of them are done.
    drop(tx);

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("tablet driver ready.  Press Ctrl-C to exit.");

    let mut ctx = DriverContext::new(registry, layout, Arc::new(LogSink::new()));
    run_event_loop(&mut ctx, &mut rx, &running).await;

    running.store(false, Ordering::Relaxed);
    drop(rx);
    for reader in readers {
        if reader.join().is_err() {
            warn!("reader thread panicked");
        }
    }

    info!("tablet driver stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
