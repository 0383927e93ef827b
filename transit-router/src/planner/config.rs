//! Router configuration.

use chrono::Duration;
use serde::Deserialize;

/// Configuration parameters for journey search.
///
/// Every field has a default, so a partial JSON object is enough to
/// override individual settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Minimum time to change vehicles at one stop or station (seconds).
    pub same_station_transfer_secs: u32,

    /// Walking speed used to estimate footpath durations (metres/second).
    pub walking_speed_mps: f64,

    /// Walks longer than this are never suggested (metres).
    pub max_walking_distance_m: f64,

    /// Maximum number of vehicle changes allowed.
    pub max_transfers: usize,

    /// Maximum number of journeys to return.
    pub max_results: usize,

    /// How far past the requested time departures are considered (minutes).
    pub search_window_mins: i64,

    /// Upper bound on scans per query when collecting alternatives.
    pub max_departure_rounds: usize,

    /// Maximum total journey time (minutes).
    /// Connections departing later than this after the floor are not scanned.
    pub max_journey_mins: i64,
}

impl RouterConfig {
    /// Create a new configuration with the given parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        same_station_transfer_secs: u32,
        walking_speed_mps: f64,
        max_walking_distance_m: f64,
        max_transfers: usize,
        max_results: usize,
        search_window_mins: i64,
        max_departure_rounds: usize,
        max_journey_mins: i64,
    ) -> Self {
        Self {
            same_station_transfer_secs,
            walking_speed_mps,
            max_walking_distance_m,
            max_transfers,
            max_results,
            search_window_mins,
            max_departure_rounds,
            max_journey_mins,
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the search window as a Duration.
    pub fn search_window(&self) -> Duration {
        Duration::minutes(self.search_window_mins)
    }

    /// Returns the maximum journey time as a Duration.
    pub fn max_journey(&self) -> Duration {
        Duration::minutes(self.max_journey_mins)
    }

    /// Time to walk `distance_m` metres, rounded up to whole seconds.
    pub fn walking_secs(&self, distance_m: f64) -> u32 {
        if self.walking_speed_mps <= 0.0 {
            return u32::MAX;
        }
        (distance_m / self.walking_speed_mps).ceil().min(f64::from(u32::MAX)) as u32
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            same_station_transfer_secs: 120,
            walking_speed_mps: 1.2,
            max_walking_distance_m: 1000.0,
            max_transfers: 3,
            max_results: 5,
            search_window_mins: 60,
            max_departure_rounds: 8,
            max_journey_mins: 720, // 12 hours
        }
    }
}
