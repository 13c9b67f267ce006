//! Per-call elevation request

use serde::Serialize;
use uuid::Uuid;

/// A single acquisition attempt
///
/// `request_id` is unique per call and correlates progress polling with the
/// remote fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElevationRequest {
    pub location_key: String,
    /// Grid side length (`resolution²` samples)
    pub resolution: usize,
    pub area_size_m: f64,
    pub request_id: String,
}

impl ElevationRequest {
    pub fn new(location_key: impl Into<String>, resolution: usize, area_size_m: f64) -> Self {
        Self {
            location_key: location_key.into(),
            resolution,
            area_size_m,
            request_id: new_request_id(),
        }
    }

    /// Number of samples the grid must contain
    pub fn sample_count(&self) -> usize {
        self.resolution * self.resolution
    }

    pub fn cache_key(&self) -> String {
        cache_key(&self.location_key, self.resolution, self.area_size_m)
    }
}

/// Composite cache key: `<location>_<resolution>_<area>`
///
/// Area uses the shortest float form, so `2000.0` becomes `"2000"`.
pub fn cache_key(location_key: &str, resolution: usize, area_size_m: f64) -> String {
    format!("{}_{}_{}", location_key, resolution, area_size_m)
}

fn new_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}
