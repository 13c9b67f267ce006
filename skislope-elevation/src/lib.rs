//! skislope-elevation library interface
//!
//! Acquires square elevation grids for ski resorts from a remote elevation
//! server, normalizes them to `[0, 1]` and caches them. When the server is
//! unavailable the grid is synthesized, first from remote location metadata,
//! then from the built-in catalogue.
//!
//! ```no_run
//! use skislope_elevation::{AcquisitionOrchestrator, ElevationConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = AcquisitionOrchestrator::from_config(&ElevationConfig::default())?;
//! if let Some(grid) = orchestrator.fetch("chamonix", 64, 2000.0).await {
//!     println!("{} samples from {}", grid.len(), grid.source());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::config::ElevationConfig;
pub use crate::error::{ElevationError, ElevationResult};
pub use crate::models::{ElevationGrid, GridSource, LocationDescriptor, ProgressState};
pub use crate::services::{AcquisitionOrchestrator, GridCache, LocationRegistry};
