//! Stops and their locations.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use super::StopId;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in metres.
    pub fn distance_m(&self, other: &Coordinates) -> f64 {
        Haversine.distance(self.to_point(), other.to_point())
    }

    /// Returns true if both components are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// A stop: a platform, bay or station a vehicle calls at.
///
/// Platforms of one station share a `parent_station`, which makes transfers
/// between them cheap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub parent_station: Option<StopId>,
}

impl Stop {
    pub fn new(id: StopId, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id,
            name: name.into(),
            coordinates,
            parent_station: None,
        }
    }

    /// Set the parent station.
    pub fn with_parent(mut self, parent: StopId) -> Self {
        self.parent_station = Some(parent);
        self
    }

    /// The station this stop belongs to: its parent, or itself.
    pub fn station_id(&self) -> &StopId {
        self.parent_station.as_ref().unwrap_or(&self.id)
    }

    /// Returns true if both stops belong to the same station.
    pub fn same_station(&self, other: &Stop) -> bool {
        self.station_id() == other.station_id()
    }
}
