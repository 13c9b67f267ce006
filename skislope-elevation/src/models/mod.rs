//! Data models for elevation acquisition

pub mod grid;
pub mod location;
pub mod progress;
pub mod request;

pub use grid::{ElevationGrid, GridSource};
pub use location::{LocationDescriptor, TerrainClass};
pub use progress::ProgressState;
pub use request::{cache_key, ElevationRequest};
