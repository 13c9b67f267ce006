//! Normalized elevation grid

use crate::error::{ElevationError, ElevationResult};

pub use skislope_common::events::GridSource;

/// Square grid of normalized elevation samples
///
/// `resolution * resolution` samples in row-major order, each in `[0, 1]`.
/// Immutable once built; shared between callers as `Arc<ElevationGrid>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    resolution: usize,
    samples: Vec<f32>,
    source: GridSource,
}

impl ElevationGrid {
    /// Build a grid, checking length and range
    pub fn new(resolution: usize, samples: Vec<f32>, source: GridSource) -> ElevationResult<Self> {
        let expected = resolution * resolution;
        if samples.len() != expected {
            return Err(ElevationError::Protocol(format!(
                "grid has {} samples, expected {} for resolution {}",
                samples.len(),
                expected,
                resolution
            )));
        }
        if let Some(bad) = samples.iter().find(|s| !(0.0..=1.0).contains(*s)) {
            return Err(ElevationError::Protocol(format!(
                "sample {} outside [0, 1]",
                bad
            )));
        }
        Ok(Self { resolution, samples, source })
    }

    /// Samples already known to be valid (generator output)
    pub(crate) fn from_parts(resolution: usize, samples: Vec<f32>, source: GridSource) -> Self {
        debug_assert_eq!(samples.len(), resolution * resolution);
        debug_assert!(samples.iter().all(|s| (0.0..=1.0).contains(s)));
        Self { resolution, samples, source }
    }

    /// Grid side length
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn source(&self) -> GridSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `row`, `col`
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.resolution || col >= self.resolution {
            return None;
        }
        self.samples.get(row * self.resolution + col).copied()
    }

    pub fn min(&self) -> f32 {
        self.samples.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.samples.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}
