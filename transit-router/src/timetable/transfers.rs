//! Transfers between stops.
//!
//! A transfer is the move from one vehicle to another: waiting at the same
//! stop, changing platforms within a station, or walking to a nearby stop.
//! Explicit transfer records from the feed take precedence; otherwise the
//! minimum duration is derived from station membership or walking distance.
//! Either way a walk between stations beyond the walking limit is never
//! admissible.

use std::collections::HashMap;

use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use tracing::debug;

use crate::domain::{Coordinates, StopId};
use crate::planner::RouterConfig;

use super::error::TimetableError;
use super::record::TransferRecord;
use super::store::{ConnectionStore, StopIdx};

/// The minimum cost of a transfer between two stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferRule {
    /// Minimum time between alighting and the next departure.
    pub duration_secs: u32,
    /// Metres walked; 0 when staying at the same stop.
    pub distance_m: f64,
}

/// A precomputed footpath from one stop to a different one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footpath {
    pub to: StopIdx,
    pub duration_secs: u32,
    pub distance_m: f64,
    /// Both stops belong to one station, so this is a platform change
    /// rather than a walk in the street.
    pub within_station: bool,
}

/// Metres per degree of latitude, rounded down so search envelopes
/// over-cover the walking radius.
const METRES_PER_DEGREE: f64 = 110_000.0;

/// A stop position as `[lon, lat]` in degrees.
type IndexedStop = GeomWithData<[f64; 2], usize>;

/// Stop-pair transfer lookup for one timetable version.
#[derive(Debug, Clone)]
pub struct TransferTable {
    explicit: HashMap<(StopIdx, StopIdx), u32>,
    /// Targets of explicit records per origin stop.
    explicit_from: Vec<Vec<StopIdx>>,
    /// Stops of each station group.
    members: Vec<Vec<StopIdx>>,
    /// Outgoing footpaths per stop, fastest first.
    footpaths: Vec<Vec<Footpath>>,
    /// Change time when staying at each stop.
    change_secs: Vec<u32>,
    coordinates: Vec<Coordinates>,
    /// Station group of each stop.
    stations: Vec<u32>,
    config: RouterConfig,
}

impl TransferTable {
    /// Build the transfer table for the stops of `store`.
    ///
    /// Footpaths between stops within walking distance are precomputed in
    /// parallel, with candidates found through a spatial index.
    ///
    /// # Errors
    ///
    /// Returns [`TimetableError::UnknownStop`] if a transfer record names a
    /// stop the store doesn't have.
    pub fn build(
        store: &ConnectionStore,
        records: &[TransferRecord],
        config: &RouterConfig,
    ) -> Result<Self, TimetableError> {
        let resolve = |id: &StopId| {
            store
                .stop_index(id)
                .ok_or_else(|| TimetableError::UnknownStop(id.clone()))
        };

        let mut explicit = HashMap::with_capacity(records.len());
        let mut explicit_from = vec![Vec::new(); store.stop_count()];
        for record in records {
            let from = resolve(&record.from_stop)?;
            let to = resolve(&record.to_stop)?;
            if explicit.insert((from, to), record.min_duration_secs).is_none() && from != to {
                explicit_from[from.index()].push(to);
            }
        }

        let coordinates: Vec<_> = store.stops().iter().map(|s| s.coordinates).collect();
        let mut groups: HashMap<&StopId, u32> = HashMap::new();
        let stations: Vec<u32> = store
            .stops()
            .iter()
            .map(|s| {
                let next = groups.len() as u32;
                *groups.entry(s.station_id()).or_insert(next)
            })
            .collect();
        let mut members = vec![Vec::new(); groups.len()];
        for (i, &station) in stations.iter().enumerate() {
            members[station as usize].push(StopIdx::new(i));
        }

        let change_secs = (0..store.stop_count())
            .map(|i| {
                let idx = StopIdx::new(i);
                explicit
                    .get(&(idx, idx))
                    .copied()
                    .unwrap_or(config.same_station_transfer_secs)
            })
            .collect();

        let mut table = Self {
            explicit,
            explicit_from,
            members,
            footpaths: Vec::new(),
            change_secs,
            coordinates,
            stations,
            config: config.clone(),
        };

        let index = RTree::bulk_load(
            table
                .coordinates
                .iter()
                .enumerate()
                .map(|(i, c)| IndexedStop::new([c.lon, c.lat], i))
                .collect(),
        );
        let footpaths: Vec<Vec<Footpath>> = (0..store.stop_count())
            .into_par_iter()
            .map(|from| table.footpaths_from(&index, StopIdx::new(from)))
            .collect();
        table.footpaths = footpaths;

        debug!(
            stops = store.stop_count(),
            explicit = table.explicit.len(),
            footpaths = table.footpaths.iter().map(Vec::len).sum::<usize>(),
            "Built transfer table"
        );

        Ok(table)
    }

    /// Stops that could have a footpath from `from`: those within the
    /// walking limit, the rest of its station, and explicit targets.
    fn candidates(&self, index: &RTree<IndexedStop>, from: StopIdx) -> Vec<StopIdx> {
        let origin = self.coordinates[from.index()];
        let radius = self.config.max_walking_distance_m.max(0.0);
        let dlat = radius / METRES_PER_DEGREE;
        let dlon = radius / (METRES_PER_DEGREE * origin.lat.to_radians().cos().max(0.01));
        let envelope = AABB::from_corners(
            [origin.lon - dlon, origin.lat - dlat],
            [origin.lon + dlon, origin.lat + dlat],
        );

        let mut stops: Vec<StopIdx> = index
            .locate_in_envelope(&envelope)
            .map(|p| StopIdx::new(p.data))
            .chain(self.members[self.stations[from.index()] as usize].iter().copied())
            .chain(self.explicit_from[from.index()].iter().copied())
            .filter(|&to| to != from)
            .collect();
        stops.sort_unstable_by_key(|s| s.index());
        stops.dedup();
        stops
    }

    fn footpaths_from(&self, index: &RTree<IndexedStop>, from: StopIdx) -> Vec<Footpath> {
        let mut paths: Vec<Footpath> = self
            .candidates(index, from)
            .into_iter()
            .filter_map(|to| {
                let rule = self.rule(from, to)?;
                Some(Footpath {
                    to,
                    duration_secs: rule.duration_secs,
                    distance_m: rule.distance_m,
                    within_station: self.same_station(from, to),
                })
            })
            .collect();
        paths.sort_by_key(|p| p.duration_secs);
        paths
    }

    /// The transfer rule from `from` to `to`, or `None` if the walk is too
    /// long to be admissible.
    ///
    /// Explicit transfers win; then the same stop or station costs the
    /// configured change time; otherwise the walking time over the
    /// great-circle distance. Stops of different stations further apart
    /// than the walking limit have no rule, explicit or not.
    pub fn rule(&self, from: StopIdx, to: StopIdx) -> Option<TransferRule> {
        let distance_m = if from == to { 0.0 } else { self.distance_m(from, to) };
        if !self.same_station(from, to) && distance_m > self.config.max_walking_distance_m {
            return None;
        }

        if let Some(&secs) = self.explicit.get(&(from, to)) {
            return Some(TransferRule {
                duration_secs: secs,
                distance_m,
            });
        }
        if from == to {
            return Some(TransferRule {
                duration_secs: self.change_secs(from),
                distance_m,
            });
        }
        if self.same_station(from, to) {
            return Some(TransferRule {
                duration_secs: self.config.same_station_transfer_secs,
                distance_m,
            });
        }
        Some(TransferRule {
            duration_secs: self.config.walking_secs(distance_m),
            distance_m,
        })
    }

    /// Minimum time to change vehicles without leaving `stop`.
    pub fn change_secs(&self, stop: StopIdx) -> u32 {
        self.change_secs[stop.index()]
    }

    /// Footpaths leaving `stop`, fastest first.
    pub fn footpaths(&self, stop: StopIdx) -> &[Footpath] {
        &self.footpaths[stop.index()]
    }

    /// Great-circle distance between two stops, in metres.
    pub fn distance_m(&self, from: StopIdx, to: StopIdx) -> f64 {
        self.coordinates[from.index()].distance_m(&self.coordinates[to.index()])
    }

    /// Returns true if both stops belong to the same station.
    pub fn same_station(&self, a: StopIdx, b: StopIdx) -> bool {
        self.stations[a.index()] == self.stations[b.index()]
    }

    pub fn max_walking_distance_m(&self) -> f64 {
        self.config.max_walking_distance_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stop;

    fn id(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    /// A station with two platforms, a stop 600m away and one 5km away.
    fn store() -> ConnectionStore {
        let stops = vec![
            Stop::new(id("P1"), "Platform 1", Coordinates::new(-38.0, 144.0)).with_parent(id("STN")),
            Stop::new(id("P2"), "Platform 2", Coordinates::new(-38.0, 144.0005)).with_parent(id("STN")),
            Stop::new(id("NEAR"), "Near", Coordinates::new(-38.0054, 144.0)),
            Stop::new(id("FAR"), "Far", Coordinates::new(-38.045, 144.0)),
        ];
        ConnectionStore::build(stops, vec![]).unwrap()
    }

    fn idx(store: &ConnectionStore, s: &str) -> StopIdx {
        store.stop_index(&id(s)).unwrap()
    }

    #[test]
    fn same_stop_uses_change_time() {
        let store = store();
        let table = TransferTable::build(&store, &[], &RouterConfig::default()).unwrap();
        let p1 = idx(&store, "P1");

        let rule = table.rule(p1, p1).unwrap();
        assert_eq!(rule.duration_secs, 120);
        assert_eq!(rule.distance_m, 0.0);
        assert_eq!(table.change_secs(p1), 120);
    }

    #[test]
    fn same_station_platforms() {
        let store = store();
        let table = TransferTable::build(&store, &[], &RouterConfig::default()).unwrap();
        let (p1, p2) = (idx(&store, "P1"), idx(&store, "P2"));

        assert!(table.same_station(p1, p2));
        let rule = table.rule(p1, p2).unwrap();
        assert_eq!(rule.duration_secs, 120);
        assert!(rule.distance_m > 0.0);
    }

    #[test]
    fn walking_fallback_and_limit() {
        let store = store();
        let table = TransferTable::build(&store, &[], &RouterConfig::default()).unwrap();
        let (p1, near, far) = (idx(&store, "P1"), idx(&store, "NEAR"), idx(&store, "FAR"));

        let rule = table.rule(p1, near).unwrap();
        assert!((550.0..650.0).contains(&rule.distance_m), "got {}", rule.distance_m);
        assert_eq!(
            rule.duration_secs,
            (rule.distance_m / 1.2).ceil() as u32
        );

        assert!(table.distance_m(p1, far) > 1000.0);
        assert!(table.rule(p1, far).is_none());
    }

    fn record(from: &str, to: &str, secs: u32) -> TransferRecord {
        TransferRecord {
            from_stop: id(from),
            to_stop: id(to),
            min_duration_secs: secs,
        }
    }

    #[test]
    fn explicit_transfers_win() {
        let store = store();
        let records = vec![record("P1", "NEAR", 900), record("P1", "P1", 30)];
        let table = TransferTable::build(&store, &records, &RouterConfig::default()).unwrap();
        let (p1, near) = (idx(&store, "P1"), idx(&store, "NEAR"));

        assert_eq!(table.rule(p1, near).unwrap().duration_secs, 900);
        // Explicit records are directional
        assert_eq!(
            table.rule(near, p1).unwrap().duration_secs,
            RouterConfig::default().walking_secs(table.distance_m(near, p1))
        );
        assert_eq!(table.change_secs(p1), 30);
        assert_eq!(table.footpaths(p1)[1].duration_secs, 900);
    }

    #[test]
    fn explicit_transfer_beyond_walking_limit() {
        let store = store();
        let records = vec![record("P1", "FAR", 300)];
        let table = TransferTable::build(&store, &records, &RouterConfig::default()).unwrap();
        let (p1, far) = (idx(&store, "P1"), idx(&store, "FAR"));

        assert!(table.distance_m(p1, far) > 5000.0);
        assert!(table.rule(p1, far).is_none());
        assert!(table.footpaths(p1).iter().all(|p| p.to != far));
    }

    #[test]
    fn explicit_transfer_within_station_ignores_distance() {
        let stops = vec![
            Stop::new(id("N"), "North concourse", Coordinates::new(-38.0, 144.0)).with_parent(id("STN")),
            Stop::new(id("S"), "South concourse", Coordinates::new(-38.015, 144.0)).with_parent(id("STN")),
        ];
        let store = ConnectionStore::build(stops, vec![]).unwrap();
        let table =
            TransferTable::build(&store, &[record("N", "S", 600)], &RouterConfig::default()).unwrap();
        let (n, s) = (idx(&store, "N"), idx(&store, "S"));

        assert!(table.distance_m(n, s) > 1000.0);
        assert_eq!(table.rule(n, s).unwrap().duration_secs, 600);
        assert_eq!(table.footpaths(n).len(), 1);
        assert!(table.footpaths(n)[0].within_station);
    }

    #[test]
    fn footpaths_are_precomputed_fastest_first() {
        let store = store();
        let table = TransferTable::build(&store, &[], &RouterConfig::default()).unwrap();
        let p1 = idx(&store, "P1");

        let paths = table.footpaths(p1);
        let targets: Vec<_> = paths.iter().map(|p| store.stop(p.to).id.as_str()).collect();
        assert_eq!(targets, vec!["P2", "NEAR"]);
        assert!(paths[0].within_station);
        assert!(!paths[1].within_station);
    }

    #[test]
    fn indexed_footpaths_match_pairwise_rules() {
        let stops: Vec<Stop> = (0..40)
            .map(|i| {
                let lat = -38.0 + f64::from(i % 8) * 0.003;
                let lon = 144.0 + f64::from(i / 8) * 0.004;
                Stop::new(id(&format!("S{i}")), format!("Stop {i}"), Coordinates::new(lat, lon))
            })
            .collect();
        let store = ConnectionStore::build(stops, vec![]).unwrap();
        let table = TransferTable::build(&store, &[], &RouterConfig::default()).unwrap();

        for from in (0..store.stop_count()).map(StopIdx::new) {
            let mut expected: Vec<usize> = (0..store.stop_count())
                .map(StopIdx::new)
                .filter(|&to| to != from && table.rule(from, to).is_some())
                .map(StopIdx::index)
                .collect();
            let mut found: Vec<usize> = table.footpaths(from).iter().map(|p| p.to.index()).collect();
            expected.sort_unstable();
            found.sort_unstable();
            assert_eq!(found, expected, "footpaths from S{}", from.index());
        }
    }

    #[test]
    fn unknown_stop_in_record() {
        let store = store();
        let records = vec![TransferRecord {
            from_stop: id("P1"),
            to_stop: id("NOPE"),
            min_duration_secs: 60,
        }];
        let result = TransferTable::build(&store, &records, &RouterConfig::default());
        assert_eq!(
            result.unwrap_err(),
            TimetableError::UnknownStop(id("NOPE"))
        );
    }
}
