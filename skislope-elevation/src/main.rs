//! skislope-elevation - command-line elevation fetcher
//!
//! `fetch` acquires one grid through the full fallback chain and optionally
//! writes it as JSON. `locations` lists the built-in catalogue and `config`
//! shows the effective settings or saves them to a file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use skislope_common::config::write_toml_config;
use skislope_elevation::{AcquisitionOrchestrator, ElevationConfig, LocationRegistry, ProgressState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for skislope-elevation
#[derive(Parser, Debug)]
#[command(name = "skislope-elevation")]
#[command(about = "Fetch normalized elevation grids for ski resorts")]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true, env = "SKISLOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Elevation server base URL
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Log level or filter directive (overrides RUST_LOG and config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one elevation grid
    Fetch {
        /// Location key (see `locations`)
        location: String,

        /// Grid side length
        #[arg(short, long, default_value_t = 64)]
        resolution: i64,

        /// Area side length in meters
        #[arg(short, long, default_value_t = 2000.0)]
        area_size: f64,

        /// Write the grid as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List supported locations
    Locations,
    /// Print the resolved configuration as TOML
    Config {
        /// Save it to this file instead of printing
        #[arg(short, long)]
        write: Option<PathBuf>,
    },
}

/// JSON document written by `fetch --output`
#[derive(Serialize)]
struct GridDocument<'a> {
    location: &'a str,
    resolution: usize,
    area_size: f64,
    source: &'a str,
    elevation_data: &'a [f32],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ElevationConfig::resolve(cli.config.as_deref(), cli.server_url.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config, cli.log_level.as_deref())?;
    info!("skislope-elevation {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Locations => {
            list_locations(LocationRegistry::builtin());
            Ok(())
        }
        Command::Config { write: None } => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Config { write: Some(path) } => {
            write_toml_config(&config, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
        Command::Fetch {
            location,
            resolution,
            area_size,
            output,
        } => fetch(&config, &location, resolution, area_size, output.as_deref()).await,
    }
}

fn init_tracing(config: &ElevationConfig, cli_level: Option<&str>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level).context("Invalid --log-level")?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.level))
            .context("Invalid log level in config")?,
    };

    let file_layer = match config.log_file() {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

fn list_locations(registry: &LocationRegistry) {
    for location in registry.iter() {
        println!(
            "{:<10} {:<24} {:<12} {:>5.0}-{:>5.0} m",
            location.key,
            location.display_name,
            location.country,
            location.base_elevation_m,
            location.peak_elevation_m
        );
    }
}

async fn fetch(
    config: &ElevationConfig,
    location: &str,
    resolution: i64,
    area_size: f64,
    output: Option<&Path>,
) -> Result<()> {
    let orchestrator = AcquisitionOrchestrator::from_config(config)?.with_progress_hook(Arc::new(
        |_request_id: &str, state: &ProgressState| {
            eprintln!("[{:>3.0}%] {}", state.percent, state.message);
        },
    ));

    let grid = tokio::select! {
        grid = orchestrator.fetch(location, resolution, area_size) => grid,
        _ = signal::ctrl_c() => {
            warn!("Interrupted");
            return Ok(());
        }
    };

    let grid = grid.with_context(|| {
        format!(
            "Invalid request: location {:?}, resolution {}, area size {} (see `locations`)",
            location, resolution, area_size
        )
    })?;

    println!(
        "{}: {}x{} grid from {} (min {:.3}, max {:.3}, {} samples)",
        location,
        grid.resolution(),
        grid.resolution(),
        grid.source(),
        grid.min(),
        grid.max(),
        grid.len()
    );
    if grid.source().is_synthetic() {
        eprintln!("Elevation server unavailable, terrain is synthetic");
    }

    if let Some(path) = output {
        let document = GridDocument {
            location,
            resolution: grid.resolution(),
            area_size,
            source: grid.source().as_str(),
            elevation_data: grid.samples(),
        };
        let json = serde_json::to_vec(&document)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Grid written to {}", path.display());
    }

    Ok(())
}
