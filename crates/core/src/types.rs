//! Core geographic types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position in the relative-to-home frame
///
/// Latitude and longitude are decimal degrees; altitude is meters above the
/// home position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Altitude in meters, relative to home
    #[serde(default)]
    pub alt: f64,
}

impl Location {
    /// Create a new location
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Same horizontal position at a different altitude
    pub fn at_altitude(self, alt: f64) -> Self {
        Self { alt, ..self }
    }

    /// Planar distance to `other` in degree space.
    ///
    /// This is a plain Euclidean distance over (lat, lon), not a geodesic one.
    /// Navigation thresholds are expressed in the same unit.
    pub fn planar_distance(&self, other: &Location) -> f64 {
        let dlat = self.lat - other.lat;
        let dlon = self.lon - other.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }
}

/// Horizontal coordinate of a named delivery zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockPoint {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

/// Static mapping of delivery block names to their coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockCoordinates {
    blocks: BTreeMap<String, BlockPoint>,
}

impl BlockCoordinates {
    /// Build a block table from `(name, lat, lon)` entries
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, f64, f64)>) -> Self {
        let blocks = entries
            .into_iter()
            .map(|(name, lat, lon)| (name.to_string(), BlockPoint { lat, lon }))
            .collect();
        Self { blocks }
    }

    /// Resolve a block to a ground-level location
    pub fn get(&self, block: &str) -> Option<Location> {
        self.blocks
            .get(block)
            .map(|point| Location::new(point.lat, point.lon, 0.0))
    }

    /// Check whether a block is configured
    pub fn contains(&self, block: &str) -> bool {
        self.blocks.contains_key(block)
    }

    /// Configured block names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    /// Number of configured blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no blocks are configured
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
