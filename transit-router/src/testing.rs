//! Timetable builders shared by unit tests.

use crate::domain::{Coordinates, Mode, RouteId, ServiceTime, Stop, StopId, TripId};
use crate::planner::RouterConfig;
use crate::timetable::{ConnectionRecord, Network, StopIdx, TransferRecord};

pub fn stop_id(s: &str) -> StopId {
    StopId::parse(s).unwrap()
}

pub fn time(s: &str) -> ServiceTime {
    ServiceTime::parse(s).unwrap()
}

/// Builds small networks hop by hop.
///
/// Stops added with [`NetworkBuilder::new`] are laid out about 11km apart,
/// so no footpaths exist between them unless placed explicitly.
pub struct NetworkBuilder {
    stops: Vec<Stop>,
    records: Vec<ConnectionRecord>,
    transfers: Vec<TransferRecord>,
    config: RouterConfig,
}

impl NetworkBuilder {
    pub fn new(names: &[&str]) -> Self {
        let stops = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let lat = -37.0 - 0.1 * i as f64;
                Stop::new(stop_id(name), *name, Coordinates::new(lat, 144.0))
            })
            .collect();
        Self {
            stops,
            records: Vec::new(),
            transfers: Vec::new(),
            config: RouterConfig::default(),
        }
    }

    /// Add a stop at an explicit position.
    pub fn stop_at(mut self, name: &str, lat: f64, lon: f64) -> Self {
        self.stops
            .push(Stop::new(stop_id(name), name, Coordinates::new(lat, lon)));
        self
    }

    pub fn named(mut self, id: &str, name: &str) -> Self {
        if let Some(stop) = self.stops.iter_mut().find(|s| s.id.as_str() == id) {
            stop.name = name.to_string();
        }
        self
    }

    /// Add a trip as consecutive hops `(from, to, departure, arrival)`.
    pub fn trip(mut self, trip: &str, mode: Mode, hops: &[(&str, &str, &str, &str)]) -> Self {
        self.records.extend(hops.iter().enumerate().map(
            |(i, (from, to, dep, arr))| ConnectionRecord {
                trip_id: TripId::parse(trip).unwrap(),
                route_id: RouteId::parse(&format!("R-{trip}")).unwrap(),
                mode,
                sequence: i as u32 + 1,
                from_stop: stop_id(from),
                to_stop: stop_id(to),
                departure: time(dep),
                arrival: time(arr),
            },
        ));
        self
    }

    pub fn transfer(mut self, from: &str, to: &str, secs: u32) -> Self {
        self.transfers.push(TransferRecord {
            from_stop: stop_id(from),
            to_stop: stop_id(to),
            min_duration_secs: secs,
        });
        self
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Network {
        Network::build(self.stops, self.records, &self.transfers, &self.config).unwrap()
    }
}

pub fn idx(network: &Network, s: &str) -> StopIdx {
    network.store.stop_index(&stop_id(s)).unwrap()
}

/// Tarneit to Waurn Ponds via Geelong, with a slow direct coach.
pub fn reference_network() -> Network {
    NetworkBuilder::new(&["47648", "20314", "47641", "LARA"])
        .named("47648", "Tarneit")
        .named("20314", "Geelong")
        .named("47641", "Waurn Ponds")
        .trip(
            "GEL-1417",
            Mode::Rail,
            &[
                ("47648", "LARA", "14:17:00", "14:36:00"),
                ("LARA", "20314", "14:37:00", "14:51:00"),
            ],
        )
        .trip(
            "WPD-1454",
            Mode::Rail,
            &[("20314", "47641", "14:54:00", "15:08:00")],
        )
        .trip(
            "COACH-1405",
            Mode::Bus,
            &[("47648", "47641", "14:05:00", "15:30:00")],
        )
        .build()
}
