//! The connection store.
//!
//! All scheduled hops of every trip, in one array sorted by departure time.
//! Stops and trips are interned to dense indices so the scan can keep its
//! per-stop and per-trip state in flat vectors.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{Mode, RouteId, ServiceTime, Stop, StopId, TripId};

use super::error::TimetableError;
use super::record::ConnectionRecord;

/// Dense index of a stop in a [`ConnectionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopIdx(u32);

impl StopIdx {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense index of a trip run in a [`ConnectionStore`].
///
/// A run is a maximal stretch of one trip in one mode. A feed trip that
/// changes mode part way is stored as several runs, so riding through the
/// mode change counts as a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripIdx(u32);

impl TripIdx {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One scheduled hop between two consecutive stops of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: StopIdx,
    pub to: StopIdx,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
    pub trip: TripIdx,
    pub mode: Mode,
    /// Position of this hop within its trip run, from 0.
    pub hop: u32,
}

/// Metadata for one trip run.
#[derive(Debug, Clone)]
pub struct TripInfo {
    pub id: TripId,
    pub route_id: RouteId,
    pub mode: Mode,
    /// Store indices of this run's connections, in hop order.
    connections: Vec<usize>,
}

impl TripInfo {
    pub fn connections(&self) -> &[usize] {
        &self.connections
    }
}

/// Immutable, time-sorted store of connections.
///
/// Built once per timetable version and shared read-only between queries.
#[derive(Debug, Clone)]
pub struct ConnectionStore {
    stops: Vec<Stop>,
    stop_index: HashMap<StopId, StopIdx>,
    trips: Vec<TripInfo>,
    connections: Vec<Connection>,
}

impl ConnectionStore {
    /// Build a store, sorting connections by departure time.
    ///
    /// Sorting is stable: connections departing at the same time keep their
    /// input order, except that hops of one trip always follow the trip's
    /// sequence.
    ///
    /// # Errors
    ///
    /// Fails if a stop is duplicated or badly placed, if a connection names
    /// an unknown stop or arrives before it departs, or if a trip's hops
    /// are out of order or do not connect.
    pub fn build(
        stops: Vec<Stop>,
        records: Vec<ConnectionRecord>,
    ) -> Result<Self, TimetableError> {
        Self::assemble(stops, records, true)
    }

    /// Build a store from connections the caller asserts are already
    /// sorted by departure time.
    ///
    /// # Errors
    ///
    /// As for [`ConnectionStore::build`], plus [`TimetableError::Unsorted`]
    /// if the assertion is false.
    pub fn from_sorted(
        stops: Vec<Stop>,
        records: Vec<ConnectionRecord>,
    ) -> Result<Self, TimetableError> {
        Self::assemble(stops, records, false)
    }

    fn assemble(
        stops: Vec<Stop>,
        records: Vec<ConnectionRecord>,
        sort: bool,
    ) -> Result<Self, TimetableError> {
        let stop_index = index_stops(&stops)?;

        let mut endpoints = Vec::with_capacity(records.len());
        for record in &records {
            let from = lookup(&stop_index, &record.from_stop)?;
            let to = lookup(&stop_index, &record.to_stop)?;
            if record.arrival < record.departure {
                return Err(TimetableError::NegativeDuration {
                    trip: record.trip_id.clone(),
                    sequence: record.sequence,
                    departure: record.departure,
                    arrival: record.arrival,
                });
            }
            endpoints.push((from, to));
        }

        let mut order: Vec<usize> = (0..records.len()).collect();
        if sort {
            order.sort_by_key(|&i| records[i].departure);
        } else if let Some(position) = records
            .windows(2)
            .position(|w| w[1].departure < w[0].departure)
        {
            return Err(TimetableError::Unsorted {
                position: position + 1,
            });
        }

        let mut slot_of = vec![0usize; records.len()];
        for (slot, &record) in order.iter().enumerate() {
            slot_of[record] = slot;
        }

        // Group by trip, in first-seen order so indices are deterministic
        let mut members: HashMap<&TripId, Vec<usize>> = HashMap::new();
        let mut trip_order: Vec<&TripId> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            members
                .entry(&record.trip_id)
                .or_insert_with(|| {
                    trip_order.push(&record.trip_id);
                    Vec::new()
                })
                .push(i);
        }

        let mut trips: Vec<TripInfo> = Vec::new();
        let mut run_of = vec![(TripIdx::new(0), 0u32); records.len()];

        for trip_id in trip_order {
            let Some(hops) = members.get_mut(trip_id) else {
                continue;
            };
            hops.sort_by_key(|&i| records[i].sequence);
            check_trip(&records, hops)?;

            // Hops of one trip claim their slots in sequence order. Within a
            // trip departures never decrease, so this keeps the array sorted.
            let mut slots: Vec<usize> = hops.iter().map(|&i| slot_of[i]).collect();
            slots.sort_unstable();
            for (&i, &slot) in hops.iter().zip(&slots) {
                slot_of[i] = slot;
            }

            for (n, &i) in hops.iter().enumerate() {
                let record = &records[i];
                let starts_run = n == 0 || records[hops[n - 1]].mode != record.mode;
                if starts_run {
                    trips.push(TripInfo {
                        id: record.trip_id.clone(),
                        route_id: record.route_id.clone(),
                        mode: record.mode,
                        connections: Vec::new(),
                    });
                }
                let idx = TripIdx::new(trips.len() - 1);
                let run = &mut trips[idx.index()];
                run_of[i] = (idx, run.connections.len() as u32);
                run.connections.push(slot_of[i]);
            }
        }

        let mut record_at = vec![0usize; records.len()];
        for (i, &slot) in slot_of.iter().enumerate() {
            record_at[slot] = i;
        }

        let connections: Vec<Connection> = record_at
            .iter()
            .map(|&i| {
                let record = &records[i];
                let (from, to) = endpoints[i];
                let (trip, hop) = run_of[i];
                Connection {
                    from,
                    to,
                    departure: record.departure,
                    arrival: record.arrival,
                    trip,
                    mode: record.mode,
                    hop,
                }
            })
            .collect();

        debug!(
            stops = stops.len(),
            trips = trips.len(),
            connections = connections.len(),
            "Built connection store"
        );

        Ok(Self {
            stops,
            stop_index,
            trips,
            connections,
        })
    }

    /// All connections, sorted by departure.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, index: usize) -> &Connection {
        &self.connections[index]
    }

    /// Index of the first connection departing at or after `floor`.
    pub fn first_departing_from(&self, floor: ServiceTime) -> usize {
        self.connections.partition_point(|c| c.departure < floor)
    }

    /// Connections departing at or after `floor`, without copying.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::domain::{Coordinates, Mode, RouteId, ServiceTime, Stop, StopId, TripId};
    /// use transit_router::timetable::{ConnectionRecord, ConnectionStore};
    ///
    /// let a = StopId::parse("A").unwrap();
    /// let b = StopId::parse("B").unwrap();
    /// let stops = vec![
    ///     Stop::new(a.clone(), "A", Coordinates::new(-37.8, 144.9)),
    ///     Stop::new(b.clone(), "B", Coordinates::new(-37.9, 144.9)),
    /// ];
    /// let hop = |trip: &str, dep: u32| ConnectionRecord {
    ///     trip_id: TripId::parse(trip).unwrap(),
    ///     route_id: RouteId::parse("R").unwrap(),
    ///     mode: Mode::Bus,
    ///     sequence: 1,
    ///     from_stop: a.clone(),
    ///     to_stop: b.clone(),
    ///     departure: ServiceTime::from_hms(dep, 0, 0),
    ///     arrival: ServiceTime::from_hms(dep, 30, 0),
    /// };
    ///
    /// let store = ConnectionStore::build(stops, vec![hop("T2", 11), hop("T1", 9)]).unwrap();
    /// let later = store.connections_from(ServiceTime::from_hms(10, 0, 0));
    /// assert_eq!(later.len(), 1);
    /// assert_eq!(later[0].departure, ServiceTime::from_hms(11, 0, 0));
    /// ```
    pub fn connections_from(&self, floor: ServiceTime) -> &[Connection] {
        &self.connections[self.first_departing_from(floor)..]
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Look up the dense index of a stop.
    pub fn stop_index(&self, id: &StopId) -> Option<StopIdx> {
        self.stop_index.get(id).copied()
    }

    pub fn stop(&self, idx: StopIdx) -> &Stop {
        &self.stops[idx.index()]
    }

    /// Look up a stop by identifier.
    pub fn stop_by_id(&self, id: &StopId) -> Option<&Stop> {
        self.stop_index(id).map(|idx| self.stop(idx))
    }

    /// Display name of a stop, if known.
    pub fn stop_name(&self, id: &StopId) -> Option<&str> {
        self.stop_by_id(id).map(|s| s.name.as_str())
    }

    pub fn trip(&self, idx: TripIdx) -> &TripInfo {
        &self.trips[idx.index()]
    }
}

fn index_stops(stops: &[Stop]) -> Result<HashMap<StopId, StopIdx>, TimetableError> {
    let mut index = HashMap::with_capacity(stops.len());
    for (i, stop) in stops.iter().enumerate() {
        if !stop.coordinates.is_valid() {
            return Err(TimetableError::InvalidCoordinates(stop.id.clone()));
        }
        if index.insert(stop.id.clone(), StopIdx::new(i)).is_some() {
            return Err(TimetableError::DuplicateStop(stop.id.clone()));
        }
    }
    Ok(index)
}

fn lookup(index: &HashMap<StopId, StopIdx>, id: &StopId) -> Result<StopIdx, TimetableError> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| TimetableError::UnknownStop(id.clone()))
}

/// Check one trip's hops, given in sequence order.
fn check_trip(records: &[ConnectionRecord], hops: &[usize]) -> Result<(), TimetableError> {
    for pair in hops.windows(2) {
        let (prev, next) = (&records[pair[0]], &records[pair[1]]);
        if next.sequence <= prev.sequence || next.departure < prev.arrival {
            return Err(TimetableError::TripOutOfOrder {
                trip: next.trip_id.clone(),
                sequence: next.sequence,
            });
        }
        if next.from_stop != prev.to_stop {
            return Err(TimetableError::TripDiscontinuous {
                trip: next.trip_id.clone(),
                sequence: next.sequence,
                arrived: prev.to_stop.clone(),
                departs: next.from_stop.clone(),
            });
        }
    }
    Ok(())
}
