//! Journey legs.
//!
//! A `Leg` is one continuous segment of a journey: either riding a single
//! trip between two stops, or transferring (waiting at a stop or walking to
//! another one). Scheduled fields are fixed at construction; realtime fields
//! are filled in later by the realtime adjuster.

use chrono::Duration;
use serde::Serialize;

use super::{DomainError, Mode, RouteId, ServiceTime, StopId, TripId};

/// What a leg does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegKind {
    /// Riding a vehicle on one trip.
    Transit,
    /// Changing vehicles: waiting at a stop or walking between stops.
    Transfer,
}

/// A leg of a journey.
///
/// # Invariants
///
/// - Scheduled arrival is not before scheduled departure
/// - Transit legs carry a trip and route, and visit at least two stops
/// - Transfer legs are always in walk mode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    kind: LegKind,
    mode: Mode,
    from_stop: StopId,
    to_stop: StopId,
    trip_id: Option<TripId>,
    route_id: Option<RouteId>,
    scheduled_departure: ServiceTime,
    scheduled_arrival: ServiceTime,
    /// Stops visited, including both ends.
    stop_count: usize,
    /// Metres walked (transfer legs between distinct stops).
    walking_distance_m: f64,

    // Realtime-derived state
    realtime_departure: Option<ServiceTime>,
    realtime_arrival: Option<ServiceTime>,
    delay_seconds: i32,
    cancelled: bool,
}

impl Leg {
    /// Construct a transit leg riding `trip_id` from `from_stop` to `to_stop`.
    ///
    /// Walk mode is accepted here: feeds may timetable walk links as trips.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - arrival precedes departure
    /// - fewer than two stops are visited
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::domain::{Leg, Mode, RouteId, ServiceTime, StopId, TripId};
    ///
    /// let leg = Leg::transit(
    ///     Mode::Rail,
    ///     StopId::parse("47648").unwrap(),
    ///     StopId::parse("20314").unwrap(),
    ///     TripId::parse("T1").unwrap(),
    ///     RouteId::parse("GEL").unwrap(),
    ///     ServiceTime::from_hms(14, 17, 0),
    ///     ServiceTime::from_hms(14, 51, 0),
    ///     4,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(leg.duration().num_minutes(), 34);
    /// assert_eq!(leg.intermediate_stop_count(), 2);
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub fn transit(
        mode: Mode,
        from_stop: StopId,
        to_stop: StopId,
        trip_id: TripId,
        route_id: RouteId,
        departure: ServiceTime,
        arrival: ServiceTime,
        stop_count: usize,
    ) -> Result<Self, DomainError> {
        if arrival < departure {
            return Err(DomainError::InvalidLeg("arrival before departure"));
        }
        if stop_count < 2 {
            return Err(DomainError::InvalidLeg(
                "transit leg must visit at least two stops",
            ));
        }

        Ok(Leg {
            kind: LegKind::Transit,
            mode,
            from_stop,
            to_stop,
            trip_id: Some(trip_id),
            route_id: Some(route_id),
            scheduled_departure: departure,
            scheduled_arrival: arrival,
            stop_count,
            walking_distance_m: 0.0,
            realtime_departure: None,
            realtime_arrival: None,
            delay_seconds: 0,
            cancelled: false,
        })
    }

    /// Construct a transfer leg.
    ///
    /// A transfer from a stop to itself is a wait for the minimum change
    /// time; between distinct stops it is a walk of `walking_distance_m`.
    pub fn transfer(
        from_stop: StopId,
        to_stop: StopId,
        departure: ServiceTime,
        min_duration_secs: u32,
        walking_distance_m: f64,
    ) -> Result<Self, DomainError> {
        if !walking_distance_m.is_finite() || walking_distance_m < 0.0 {
            return Err(DomainError::InvalidLeg("walking distance must be non-negative"));
        }
        let stop_count = if from_stop == to_stop { 1 } else { 2 };

        Ok(Leg {
            kind: LegKind::Transfer,
            mode: Mode::Walk,
            from_stop,
            to_stop,
            trip_id: None,
            route_id: None,
            scheduled_departure: departure,
            scheduled_arrival: departure.plus_secs(min_duration_secs),
            stop_count,
            walking_distance_m,
            realtime_departure: None,
            realtime_arrival: None,
            delay_seconds: 0,
            cancelled: false,
        })
    }

    pub fn kind(&self) -> LegKind {
        self.kind
    }

    pub fn is_transit(&self) -> bool {
        self.kind == LegKind::Transit
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == LegKind::Transfer
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn from_stop(&self) -> &StopId {
        &self.from_stop
    }

    pub fn to_stop(&self) -> &StopId {
        &self.to_stop
    }

    /// Returns the trip ridden (transit legs only).
    pub fn trip_id(&self) -> Option<&TripId> {
        self.trip_id.as_ref()
    }

    /// Returns the route ridden (transit legs only).
    pub fn route_id(&self) -> Option<&RouteId> {
        self.route_id.as_ref()
    }

    pub fn scheduled_departure(&self) -> ServiceTime {
        self.scheduled_departure
    }

    pub fn scheduled_arrival(&self) -> ServiceTime {
        self.scheduled_arrival
    }

    pub fn realtime_departure(&self) -> Option<ServiceTime> {
        self.realtime_departure
    }

    pub fn realtime_arrival(&self) -> Option<ServiceTime> {
        self.realtime_arrival
    }

    /// Departure time, realtime if known, otherwise scheduled.
    pub fn expected_departure(&self) -> ServiceTime {
        self.realtime_departure.unwrap_or(self.scheduled_departure)
    }

    /// Arrival time, realtime if known, otherwise scheduled.
    pub fn expected_arrival(&self) -> ServiceTime {
        self.realtime_arrival.unwrap_or(self.scheduled_arrival)
    }

    /// Delay at the alighting stop, in seconds (negative when early).
    pub fn delay_seconds(&self) -> i32 {
        self.delay_seconds
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn has_realtime_data(&self) -> bool {
        self.realtime_departure.is_some() || self.realtime_arrival.is_some() || self.cancelled
    }

    /// Returns the scheduled duration.
    pub fn duration(&self) -> Duration {
        self.scheduled_arrival
            .signed_duration_since(self.scheduled_departure)
    }

    /// Stops visited, including boarding and alighting stops.
    pub fn stop_count(&self) -> usize {
        self.stop_count
    }

    /// Returns the number of intermediate stops (excluding both ends).
    pub fn intermediate_stop_count(&self) -> usize {
        self.stop_count.saturating_sub(2)
    }

    pub fn walking_distance_m(&self) -> f64 {
        self.walking_distance_m
    }

    /// Record realtime times for this leg.
    pub fn set_realtime(
        &mut self,
        departure: ServiceTime,
        arrival: ServiceTime,
        delay_seconds: i32,
    ) {
        self.realtime_departure = Some(departure);
        self.realtime_arrival = Some(arrival);
        self.delay_seconds = delay_seconds;
    }

    /// Mark the leg's trip as cancelled. The leg stays in the journey.
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }
}
