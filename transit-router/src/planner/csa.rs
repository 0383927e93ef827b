//! Earliest-arrival connection scan.
//!
//! One pass over the time-sorted connections computes, for every stop, the
//! earliest arrival using at most `n` vehicle legs, for each `n` up to the
//! transfer limit plus one. Keeping a label set per leg count makes the
//! transfer limit exact and yields the fastest journey for every number of
//! changes from the same scan.
//!
//! Each label set holds two times per stop:
//!
//! - `arrival`: when the passenger can be at the stop, by vehicle or on foot
//! - `ready`: when the passenger can board a *different* vehicle there,
//!   i.e. a vehicle arrival plus the change time, or a walk arrival
//!
//! Staying on a trip never needs the change time. Which trips are boarded
//! is tracked per trip, so continuing on a trip does not depend on the
//! labels of intermediate stops.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use crate::domain::{Mode, ModeSet, ServiceTime};
use crate::timetable::{Network, StopIdx};

/// A ride on one trip run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ride {
    /// Store index of the boarding connection.
    pub board: usize,
    /// Store index of the alighting connection.
    pub alight: usize,
    /// Legs ridden before boarding.
    pub prefix: usize,
}

/// How a label was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Unreached,
    /// The query origin at the departure floor.
    Origin,
    /// Alighting from a ride. For ready labels the change time is included.
    Ride(Ride),
    /// Walking from `from`, after `after` or straight from the origin.
    Walk {
        from: StopIdx,
        duration_secs: u32,
        distance_m: f64,
        after: Option<Ride>,
    },
}

/// Parameters of one scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    pub origin: StopIdx,
    /// Enables early termination and target pruning.
    pub destination: Option<StopIdx>,
    pub departure: ServiceTime,
    pub modes: ModeSet,
    pub max_transfers: usize,
    /// Connections departing after this are not scanned.
    pub horizon: ServiceTime,
    /// Checked before each connection; when set the scan stops early.
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a> ScanRequest<'a> {
    /// A request with every mode allowed and no horizon.
    pub fn new(origin: StopIdx, departure: ServiceTime, max_transfers: usize) -> Self {
        Self {
            origin,
            destination: None,
            departure,
            modes: ModeSet::all(),
            max_transfers,
            horizon: ServiceTime::NEVER,
            cancel: None,
        }
    }

    pub fn with_destination(mut self, destination: StopIdx) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_modes(mut self, modes: ModeSet) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_horizon(mut self, horizon: ServiceTime) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Labels, one set per number of legs ridden.
#[derive(Debug, Clone)]
struct Labels {
    stops: usize,
    levels: usize,
    arrival: Vec<ServiceTime>,
    arrival_step: Vec<Step>,
    /// Arrival by vehicle only; footpaths are relaxed from these.
    ride_arrival: Vec<ServiceTime>,
    ready: Vec<ServiceTime>,
    ready_step: Vec<Step>,
}

impl Labels {
    fn new(stops: usize, levels: usize) -> Self {
        let size = stops * levels;
        Self {
            stops,
            levels,
            arrival: vec![ServiceTime::NEVER; size],
            arrival_step: vec![Step::Unreached; size],
            ride_arrival: vec![ServiceTime::NEVER; size],
            ready: vec![ServiceTime::NEVER; size],
            ready_step: vec![Step::Unreached; size],
        }
    }

    fn at(&self, level: usize, stop: StopIdx) -> usize {
        level * self.stops + stop.index()
    }

    fn arrival(&self, level: usize, stop: StopIdx) -> ServiceTime {
        self.arrival[self.at(level, stop)]
    }

    fn ready(&self, level: usize, stop: StopIdx) -> ServiceTime {
        self.ready[self.at(level, stop)]
    }

    // A label with fewer legs is also a label for every higher count, so
    // each update runs upward and stops at the first level already as good.

    fn improve_arrival(&mut self, level: usize, stop: StopIdx, time: ServiceTime, step: Step) {
        for l in level..self.levels {
            let i = self.at(l, stop);
            if time >= self.arrival[i] {
                break;
            }
            self.arrival[i] = time;
            self.arrival_step[i] = step;
        }
    }

    fn improve_ready(&mut self, level: usize, stop: StopIdx, time: ServiceTime, step: Step) {
        for l in level..self.levels {
            let i = self.at(l, stop);
            if time >= self.ready[i] {
                break;
            }
            self.ready[i] = time;
            self.ready_step[i] = step;
        }
    }

    /// Returns true if the vehicle arrival improved at `level`.
    fn improve_ride_arrival(&mut self, level: usize, stop: StopIdx, time: ServiceTime) -> bool {
        let mut improved = false;
        for l in level..self.levels {
            let i = self.at(l, stop);
            if time >= self.ride_arrival[i] {
                break;
            }
            self.ride_arrival[i] = time;
            improved = true;
        }
        improved
    }
}

/// The outcome of one scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    origin: StopIdx,
    departure: ServiceTime,
    labels: Labels,
    /// Number of connections examined.
    pub connections_scanned: usize,
    /// False if the scan was cancelled before finishing.
    pub complete: bool,
}

impl ScanResult {
    pub fn origin(&self) -> StopIdx {
        self.origin
    }

    pub fn departure(&self) -> ServiceTime {
        self.departure
    }

    /// The largest leg count labels were kept for. Lookups with more legs
    /// answer for this many.
    pub fn max_legs(&self) -> usize {
        self.labels.levels - 1
    }

    /// Earliest arrival at `stop` using at most `legs` vehicle legs.
    pub fn arrival(&self, legs: usize, stop: StopIdx) -> ServiceTime {
        self.labels.arrival(legs.min(self.max_legs()), stop)
    }

    /// Earliest arrival at `stop` with any permitted number of legs.
    pub fn earliest_arrival(&self, stop: StopIdx) -> ServiceTime {
        self.arrival(self.max_legs(), stop)
    }

    pub fn is_reached(&self, stop: StopIdx) -> bool {
        !self.earliest_arrival(stop).is_never()
    }

    /// How the arrival label was reached.
    pub fn arrival_step(&self, legs: usize, stop: StopIdx) -> Step {
        self.labels.arrival_step[self.labels.at(legs.min(self.max_legs()), stop)]
    }

    /// Earliest time a new vehicle can be boarded at `stop` after `legs`
    /// legs.
    pub fn ready(&self, legs: usize, stop: StopIdx) -> ServiceTime {
        self.labels.ready(legs.min(self.max_legs()), stop)
    }

    /// How the ready label was reached.
    pub fn ready_step(&self, legs: usize, stop: StopIdx) -> Step {
        self.labels.ready_step[self.labels.at(legs.min(self.max_legs()), stop)]
    }
}

#[derive(Debug, Clone, Copy)]
struct Boarding {
    conn: usize,
    prefix: usize,
}

/// Run one earliest-arrival scan over `network`.
///
/// An unreachable destination is a normal outcome: its arrival stays
/// [`ServiceTime::NEVER`].
///
/// Walking straight from the origin to the destination is not considered;
/// every journey rides at least one vehicle.
pub fn scan(network: &Network, request: &ScanRequest<'_>) -> ScanResult {
    let store = &network.store;
    let transfers = &network.transfers;
    // No journey rides more trip runs than the store holds
    let max_transfers = request
        .max_transfers
        .min(store.trip_count().saturating_sub(1));
    let max_legs = max_transfers.saturating_add(1);
    let mut labels = Labels::new(store.stop_count(), max_legs.saturating_add(1));
    let walking = request.modes.contains(Mode::Walk);

    let origin = request.origin;
    labels.improve_arrival(0, origin, request.departure, Step::Origin);
    labels.improve_ready(0, origin, request.departure, Step::Origin);
    for path in transfers.footpaths(origin) {
        if !(walking || path.within_station) || Some(path.to) == request.destination {
            continue;
        }
        let time = request.departure.plus_secs(path.duration_secs);
        let step = Step::Walk {
            from: origin,
            duration_secs: path.duration_secs,
            distance_m: path.distance_m,
            after: None,
        };
        labels.improve_arrival(0, path.to, time, step);
        labels.improve_ready(0, path.to, time, step);
    }

    let mut boarded: Vec<Option<Boarding>> = vec![None; store.trip_count()];
    let start = store.first_departing_from(request.departure);
    let mut scanned = 0;
    let mut complete = true;

    for (index, c) in store.connections().iter().enumerate().skip(start) {
        if request.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            complete = false;
            break;
        }
        if c.departure > request.horizon {
            break;
        }
        if let Some(dest) = request.destination {
            // Every leg count is settled once departures pass the slowest
            if c.departure >= labels.arrival(1, dest) {
                break;
            }
        }
        scanned += 1;

        if !request.modes.contains(c.mode) {
            continue;
        }

        let trip = c.trip.index();
        let limit = boarded[trip].map_or(max_legs, |b| b.prefix);
        if let Some(prefix) = (0..limit).find(|&p| labels.ready(p, c.from) <= c.departure) {
            boarded[trip] = Some(Boarding {
                conn: index,
                prefix,
            });
        }
        let Some(boarding) = boarded[trip] else {
            continue;
        };

        let legs = boarding.prefix + 1;
        if let Some(dest) = request.destination {
            if c.arrival >= labels.arrival(legs, dest) {
                continue;
            }
        }

        let ride = Ride {
            board: boarding.conn,
            alight: index,
            prefix: boarding.prefix,
        };
        labels.improve_arrival(legs, c.to, c.arrival, Step::Ride(ride));
        if !labels.improve_ride_arrival(legs, c.to, c.arrival) {
            continue;
        }

        let change = c.arrival.plus_secs(transfers.change_secs(c.to));
        labels.improve_ready(legs, c.to, change, Step::Ride(ride));

        for path in transfers.footpaths(c.to) {
            if !(walking || path.within_station) {
                continue;
            }
            let time = c.arrival.plus_secs(path.duration_secs);
            let step = Step::Walk {
                from: c.to,
                duration_secs: path.duration_secs,
                distance_m: path.distance_m,
                after: Some(ride),
            };
            labels.improve_arrival(legs, path.to, time, step);
            labels.improve_ready(legs, path.to, time, step);
        }

        trace!(index, legs, to = c.to.index(), arrival = %c.arrival, "Improved stop");
    }

    debug!(
        origin = origin.index(),
        departure = %request.departure,
        scanned,
        complete,
        "Connection scan finished"
    );

    ScanResult {
        origin,
        departure: request.departure,
        labels,
        connections_scanned: scanned,
        complete,
    }
}

#[cfg(test)]
#[path = "csa_tests.rs"]
mod tests;
