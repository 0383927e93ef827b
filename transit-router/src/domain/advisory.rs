//! Advisory messages attached to journeys.

use std::fmt;

use serde::Serialize;

use super::{RouteId, StopId, TripId};

/// A notice explaining why a journey changed or became invalid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Advisory {
    /// A trip ridden by the journey has been cancelled.
    TripCancelled { trip_id: TripId, route_id: RouteId },

    /// Delays leave too little time to change vehicles.
    TransferMissed {
        at: StopId,
        available_secs: i64,
        required_secs: u32,
    },

    /// The walk between two stops exceeds the walking limit.
    TransferTooFar {
        from: StopId,
        to: StopId,
        distance_m: f64,
    },

    /// Realtime data could not be obtained; times are as scheduled.
    RealtimeUnavailable,
}

impl Advisory {
    /// Returns true if this advisory makes the journey unusable.
    pub fn invalidates(&self) -> bool {
        !matches!(self, Advisory::RealtimeUnavailable)
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::TripCancelled { trip_id, route_id } => {
                write!(f, "trip {trip_id} on route {route_id} has been cancelled")
            }
            Advisory::TransferMissed {
                at,
                available_secs,
                required_secs,
            } => write!(
                f,
                "transfer at {at} no longer feasible: {available_secs}s available, {required_secs}s needed"
            ),
            Advisory::TransferTooFar { from, to, distance_m } => write!(
                f,
                "transfer from {from} to {to} requires a {distance_m:.0}m walk"
            ),
            Advisory::RealtimeUnavailable => {
                f.write_str("realtime data unavailable, showing scheduled times")
            }
        }
    }
}
