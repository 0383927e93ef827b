//! Delay snapshots and the feed that publishes them.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{StopId, TripId};

/// Error obtaining a realtime snapshot.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    /// The feed could not be reached or has nothing to offer
    #[error("realtime feed unavailable: {0}")]
    Unavailable(String),

    /// The snapshot could not be decoded
    #[error("malformed realtime snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Delays at one stop of a trip, in seconds (negative when early).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopDelay {
    pub arrival: Option<i32>,
    pub departure: Option<i32>,
}

/// The latest known state of one trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripUpdate {
    /// Delay applied at every stop without its own entry.
    pub delay_seconds: i32,
    pub cancelled: bool,
    pub stop_delays: HashMap<StopId, StopDelay>,
}

impl TripUpdate {
    /// A trip running `secs` late throughout.
    pub fn delayed(secs: i32) -> Self {
        Self {
            delay_seconds: secs,
            ..Self::default()
        }
    }

    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }

    /// Override the delay at one stop.
    pub fn with_stop_delay(mut self, stop: StopId, delay: StopDelay) -> Self {
        self.stop_delays.insert(stop, delay);
        self
    }

    /// Departure delay at `stop`.
    pub fn departure_delay_at(&self, stop: &StopId) -> i32 {
        self.stop_delays
            .get(stop)
            .and_then(|d| d.departure)
            .unwrap_or(self.delay_seconds)
    }

    /// Arrival delay at `stop`.
    pub fn arrival_delay_at(&self, stop: &StopId) -> i32 {
        self.stop_delays
            .get(stop)
            .and_then(|d| d.arrival)
            .unwrap_or(self.delay_seconds)
    }
}

/// An immutable view of the realtime feed at one moment.
///
/// A trip missing from the snapshot is assumed to run to schedule.
///
/// # Examples
///
/// ```
/// use transit_router::domain::TripId;
/// use transit_router::realtime::DelaySnapshot;
///
/// let snapshot = DelaySnapshot::from_json(
///     r#"{"version": 7, "updates": {"GEL-1417": {"delay_seconds": 120}}}"#,
/// )
/// .unwrap();
///
/// let trip = TripId::parse("GEL-1417").unwrap();
/// assert_eq!(snapshot.version, 7);
/// assert_eq!(snapshot.get(&trip).unwrap().delay_seconds, 120);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelaySnapshot {
    /// Monotonic version assigned by the feed.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    updates: HashMap<TripId, TripUpdate>,
}

impl DelaySnapshot {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            updates: HashMap::new(),
        }
    }

    pub fn with_update(mut self, trip: TripId, update: TripUpdate) -> Self {
        self.updates.insert(trip, update);
        self
    }

    /// Decode a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, RealtimeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, trip: &TripId) -> Option<&TripUpdate> {
        self.updates.get(trip)
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Somewhere the router can ask for the current snapshot.
pub trait RealtimeSource {
    /// The latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError`] if no snapshot can be obtained. Callers
    /// proceed on scheduled times.
    fn snapshot(&self) -> Result<Arc<DelaySnapshot>, RealtimeError>;
}

/// Publish point for snapshots from the feed poller.
///
/// A publish swaps the whole snapshot at once, so readers never see a
/// partly applied update. Snapshots not newer than the current one are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct RealtimeFeed {
    inner: Arc<RwLock<Arc<DelaySnapshot>>>,
}

impl RealtimeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `snapshot` current. Returns false if it was stale.
    pub fn publish(&self, snapshot: DelaySnapshot) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if snapshot.version <= guard.version {
            debug!(
                current = guard.version,
                offered = snapshot.version,
                "Ignoring stale realtime snapshot"
            );
            return false;
        }

        let (version, trips) = (snapshot.version, snapshot.len());
        *guard = Arc::new(snapshot);
        drop(guard);

        info!(version, trips, "Realtime snapshot published");
        true
    }

    /// The snapshot current at the time of the call.
    pub fn current(&self) -> Arc<DelaySnapshot> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }
}

impl RealtimeSource for RealtimeFeed {
    fn snapshot(&self) -> Result<Arc<DelaySnapshot>, RealtimeError> {
        Ok(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(s: &str) -> TripId {
        TripId::parse(s).unwrap()
    }

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    #[test]
    fn stop_delays_override_trip_delay() {
        let update = TripUpdate::delayed(60).with_stop_delay(
            stop("20314"),
            StopDelay {
                arrival: Some(300),
                departure: None,
            },
        );

        assert_eq!(update.arrival_delay_at(&stop("20314")), 300);
        assert_eq!(update.departure_delay_at(&stop("20314")), 60);
        assert_eq!(update.arrival_delay_at(&stop("47641")), 60);
    }

    #[test]
    fn from_json_with_defaults() {
        let snapshot = DelaySnapshot::from_json(
            r#"{
                "updates": {
                    "T1": {"cancelled": true},
                    "T2": {"stop_delays": {"S": {"departure": -30}}}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get(&trip("T1")).unwrap().cancelled);
        let t2 = snapshot.get(&trip("T2")).unwrap();
        assert!(!t2.cancelled);
        assert_eq!(t2.departure_delay_at(&stop("S")), -30);
        assert!(snapshot.get(&trip("T3")).is_none());
    }

    #[test]
    fn from_json_rejects_garbage() {
        let err = DelaySnapshot::from_json("{\"updates\": 3}").unwrap_err();
        assert!(matches!(err, RealtimeError::Malformed(_)));
        assert!(err.to_string().starts_with("malformed realtime snapshot"));
    }

    #[test]
    fn feed_publishes_newer_snapshots_only() {
        let feed = RealtimeFeed::new();
        assert!(feed.current().is_empty());

        assert!(feed.publish(DelaySnapshot::new(2).with_update(trip("T1"), TripUpdate::delayed(60))));
        let held = feed.snapshot().unwrap();

        assert!(!feed.publish(DelaySnapshot::new(1)));
        assert_eq!(feed.current().version, 2);

        // A repeat of the current version does not replace it
        assert!(!feed.publish(DelaySnapshot::new(2)));
        assert_eq!(feed.current().len(), 1);

        assert!(feed.publish(DelaySnapshot::new(3)));
        assert_eq!(feed.current().version, 3);
        assert!(feed.current().is_empty());

        // Earlier readers keep their view
        assert_eq!(held.version, 2);
        assert_eq!(held.len(), 1);
    }
}
