//! Elevation acquisition services
//!
//! Leaf components (registry, normalizer, generator, gateway, tracker, cache)
//! are composed by `AcquisitionOrchestrator`.

pub mod acquisition_orchestrator;
pub mod elevation_gateway;
pub mod grid_cache;
pub mod location_registry;
pub mod normalizer;
pub mod progress_tracker;
pub mod synthetic_terrain;

pub use acquisition_orchestrator::{AcquisitionOrchestrator, ProgressHook};
pub use elevation_gateway::{ElevationSource, RemoteElevationGateway};
pub use grid_cache::{CacheEntry, GridCache};
pub use location_registry::LocationRegistry;
pub use normalizer::{normalize, Normalized};
pub use progress_tracker::{
    HttpProgressSource, ProgressCallback, ProgressPoll, ProgressSource, ProgressTracker,
    TrackerHandle, TrackerOutcome, TrackerSettings,
};
pub use synthetic_terrain::{SyntheticTerrainGenerator, TerrainProfile};
