//! Location descriptors
//!
//! The same type is used for the local catalogue and for the metadata payload
//! returned by the remote `get_location_info` tool. Field aliases accept the
//! server's wire names (`name`, `lat`, `lon`, `base_elevation`, ...).

use serde::{Deserialize, Serialize};

/// Broad terrain character of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainClass {
    GlacialAlpine,
    CoastalRange,
    HighAlpine,
    AlpineBowl,
    /// Unrecognized terrain type from a remote payload
    #[default]
    #[serde(other)]
    Other,
}

impl TerrainClass {
    /// Ridge strength used by the synthetic generator (0.0-1.0)
    ///
    /// Glaciated and high alpine terrain is broken up by sharper ridges;
    /// bowls are smooth.
    pub fn ridge_factor(&self) -> f32 {
        match self {
            TerrainClass::GlacialAlpine => 0.35,
            TerrainClass::HighAlpine => 0.30,
            TerrainClass::CoastalRange => 0.20,
            TerrainClass::AlpineBowl => 0.15,
            TerrainClass::Other => 0.20,
        }
    }
}

/// A supported geographic location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDescriptor {
    /// Unique catalogue key (e.g. "chamonix")
    ///
    /// Metadata payloads do not carry the key; the caller fills it in.
    #[serde(default)]
    pub key: String,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
    #[serde(alias = "base_elevation")]
    pub base_elevation_m: f64,
    #[serde(alias = "peak_elevation")]
    pub peak_elevation_m: f64,
    #[serde(alias = "terrain_type", default)]
    pub terrain_class: TerrainClass,
}

impl LocationDescriptor {
    /// Vertical drop between base and peak in meters
    pub fn vertical_drop_m(&self) -> f64 {
        self.peak_elevation_m - self.base_elevation_m
    }

    /// True when the elevation profile can drive terrain synthesis
    pub fn has_usable_profile(&self) -> bool {
        self.base_elevation_m.is_finite()
            && self.peak_elevation_m.is_finite()
            && self.peak_elevation_m > 0.0
            && self.peak_elevation_m >= self.base_elevation_m
    }
}
