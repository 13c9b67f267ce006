//! Static catalogue of supported locations

use crate::models::{LocationDescriptor, TerrainClass};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

static BUILTIN: Lazy<LocationRegistry> = Lazy::new(|| {
    LocationRegistry::from_descriptors(vec![
        descriptor("chamonix", "Chamonix-Mont-Blanc", "France", 45.9237, 6.8694, 1035.0, 3842.0, TerrainClass::GlacialAlpine),
        descriptor("whistler", "Whistler Blackcomb", "Canada", 50.1163, -122.9574, 652.0, 2182.0, TerrainClass::CoastalRange),
        descriptor("zermatt", "Zermatt Matterhorn", "Switzerland", 46.0207, 7.7491, 1608.0, 3883.0, TerrainClass::HighAlpine),
        descriptor("stanton", "St. Anton am Arlberg", "Austria", 47.1333, 10.2667, 1304.0, 2811.0, TerrainClass::AlpineBowl),
        descriptor("valdisere", "Val d'Isère", "France", 45.4489, 6.9797, 1550.0, 3456.0, TerrainClass::HighAlpine),
    ])
});

#[allow(clippy::too_many_arguments)]
fn descriptor(
    key: &str,
    display_name: &str,
    country: &str,
    latitude: f64,
    longitude: f64,
    base_elevation_m: f64,
    peak_elevation_m: f64,
    terrain_class: TerrainClass,
) -> LocationDescriptor {
    LocationDescriptor {
        key: key.to_string(),
        display_name: display_name.to_string(),
        country: country.to_string(),
        latitude,
        longitude,
        base_elevation_m,
        peak_elevation_m,
        terrain_class,
    }
}

/// Read-only location lookup
#[derive(Debug, Clone, Default)]
pub struct LocationRegistry {
    locations: BTreeMap<String, LocationDescriptor>,
}

impl LocationRegistry {
    /// The five reference ski resorts
    pub fn builtin() -> &'static LocationRegistry {
        &BUILTIN
    }

    /// Build a registry from any set of descriptors
    ///
    /// Later duplicates of a key replace earlier ones.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = LocationDescriptor>) -> Self {
        let locations = descriptors
            .into_iter()
            .map(|d| (d.key.clone(), d))
            .collect();
        Self { locations }
    }

    pub fn get(&self, key: &str) -> Option<&LocationDescriptor> {
        self.locations.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.locations.contains_key(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationDescriptor> {
        self.locations.values()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
