//! Procedural terrain synthesis
//!
//! Terminal fallback when no real elevation data is available. The grid is a
//! mountain-peak shape built from the location's elevation profile:
//!
//! - radial falloff from the grid centre, sharper for large vertical drops
//! - a directional tilt toward row 0 (summit side) away from the base area
//! - terrain-class ridges
//! - small position-hashed noise, seeded by the location key
//!
//! Output depends only on `(profile, resolution)`, so two runs produce the
//! same grid.

use crate::models::{ElevationGrid, GridSource, LocationDescriptor, TerrainClass};
use std::f32::consts::PI;

/// Default noise amplitude; the macro shape spans roughly 0.1-0.95
pub const DEFAULT_NOISE_AMPLITUDE: f32 = 0.03;

const FLOOR: f32 = 0.1;
const PEAK_WEIGHT: f32 = 0.65;
const RIDGE_WEIGHT: f32 = 0.15;

/// Shape coefficients derived from a location's elevation profile
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainProfile {
    /// Noise seed (hash of the location key)
    pub seed: u32,
    /// Vertical drop as a fraction of peak elevation, 0.05-0.95
    pub relief: f32,
    /// Radial falloff exponent; larger is a sharper peak
    pub steepness: f32,
    /// Tilt from base area to summit side
    pub directional_bias: f32,
    /// Ridge strength from the terrain class
    pub ridge_factor: f32,
    /// Tier that will be reported on the generated grid
    pub origin: GridSource,
}

impl TerrainProfile {
    /// Profile from the local catalogue
    pub fn from_local(location: &LocationDescriptor) -> Self {
        Self::build(location, GridSource::LocalSynthetic)
    }

    /// Profile from remote metadata
    pub fn from_metadata(metadata: &LocationDescriptor) -> Self {
        Self::build(metadata, GridSource::MetadataSynthetic)
    }

    fn build(location: &LocationDescriptor, origin: GridSource) -> Self {
        let base = location.base_elevation_m.min(location.peak_elevation_m);
        let peak = location.base_elevation_m.max(location.peak_elevation_m);

        let relief = if peak > 0.0 && peak.is_finite() && base.is_finite() {
            (((peak - base) / peak) as f32).clamp(0.05, 0.95)
        } else {
            0.5
        };

        Self {
            seed: seed_from_key(&location.key),
            relief,
            steepness: 1.0 + relief * 2.0,
            directional_bias: 0.25 * relief,
            ridge_factor: location.terrain_class.ridge_factor(),
            origin,
        }
    }
}

impl Default for TerrainProfile {
    fn default() -> Self {
        Self {
            seed: 0,
            relief: 0.5,
            steepness: 2.0,
            directional_bias: 0.125,
            ridge_factor: TerrainClass::Other.ridge_factor(),
            origin: GridSource::LocalSynthetic,
        }
    }
}

/// Deterministic terrain generator
#[derive(Debug, Clone)]
pub struct SyntheticTerrainGenerator {
    noise_amplitude: f32,
}

impl Default for SyntheticTerrainGenerator {
    fn default() -> Self {
        Self {
            noise_amplitude: DEFAULT_NOISE_AMPLITUDE,
        }
    }
}

impl SyntheticTerrainGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator with custom noise amplitude (0 disables noise)
    pub fn with_noise_amplitude(noise_amplitude: f32) -> Self {
        Self {
            noise_amplitude: noise_amplitude.clamp(0.0, 0.1),
        }
    }

    /// Generate a `resolution²` grid, every sample in `[0, 1]`
    ///
    /// Never fails. A resolution of 0 yields an empty grid.
    pub fn generate(&self, profile: &TerrainProfile, resolution: usize) -> ElevationGrid {
        let mut samples = Vec::with_capacity(resolution * resolution);
        let step = if resolution > 1 {
            1.0 / (resolution - 1) as f32
        } else {
            0.0
        };
        let max_radius = 0.5f32.sqrt();

        for row in 0..resolution {
            let v = if resolution > 1 { row as f32 * step } else { 0.5 };
            for col in 0..resolution {
                let u = if resolution > 1 { col as f32 * step } else { 0.5 };

                let dx = u - 0.5;
                let dz = v - 0.5;
                let r = ((dx * dx + dz * dz).sqrt() / max_radius).min(1.0);
                let radial = (1.0 - r).powf(profile.steepness);

                let tilt = profile.directional_bias * (1.0 - v);

                let ridge = RIDGE_WEIGHT
                    * profile.ridge_factor
                    * (u * PI * 3.0).sin()
                    * (v * PI * 2.0).cos()
                    * (1.0 - r);

                let noise = self.noise_amplitude
                    * unit_noise(col as u32, row as u32, profile.seed);

                let height = FLOOR + PEAK_WEIGHT * radial + tilt + ridge + noise;
                samples.push(height.clamp(0.0, 1.0));
            }
        }

        ElevationGrid::from_parts(resolution, samples, profile.origin)
    }
}

/// FNV-1a over the key bytes, folded to 32 bits
fn seed_from_key(key: &str) -> u32 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in key.as_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    (h ^ (h >> 32)) as u32
}

fn terrain_hash(x: u32, z: u32, seed: u32) -> u32 {
    let mut n = x ^ seed.rotate_left(7);
    n = n.wrapping_mul(0x6C8E_9CF5) ^ z.wrapping_mul(0xB529_7A4D);
    n ^= n >> 13;
    n = n.wrapping_mul(0x68E3_1DA5);
    n ^= n >> 11;
    n = n.wrapping_mul(0x1B56_C4E9);
    n ^ (n >> 16)
}

/// Position-derived noise in `[-1, 1]`
fn unit_noise(x: u32, z: u32, seed: u32) -> f32 {
    (terrain_hash(x, z, seed) as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
}
