//! Ingestion records.
//!
//! These are the shapes the timetable loader hands to the router. They carry
//! feed identifiers as strings; the store resolves them to dense indices.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{Mode, RouteId, ServiceTime, Stop, StopId, TripId};
use crate::planner::RouterConfig;

use super::{Network, TimetableError};

/// One scheduled hop of one trip between two consecutive stops.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionRecord {
    pub trip_id: TripId,
    pub route_id: RouteId,
    /// Read from the feed's numeric `route_type`.
    #[serde(rename = "route_type", deserialize_with = "mode_from_route_type")]
    pub mode: Mode,
    /// Position within the trip; strictly increasing along the trip.
    pub sequence: u32,
    pub from_stop: StopId,
    pub to_stop: StopId,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
}

/// An explicit minimum transfer time between two stops.
///
/// A record with `from_stop == to_stop` sets the change time at that stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from_stop: StopId,
    pub to_stop: StopId,
    pub min_duration_secs: u32,
}

fn mode_from_route_type<'de, D>(deserializer: D) -> Result<Mode, D::Error>
where
    D: Deserializer<'de>,
{
    let route_type = u16::deserialize(deserializer)?;
    Mode::from_route_type(route_type).map_err(serde::de::Error::custom)
}

/// A whole timetable version as delivered by the loader.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimetableFile {
    pub stops: Vec<Stop>,
    pub connections: Vec<ConnectionRecord>,
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
}

impl TimetableFile {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate the records and build a routable network.
    pub fn into_network(self, config: &RouterConfig) -> Result<Network, TimetableError> {
        Network::build(self.stops, self.connections, &self.transfers, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_connection_record() {
        let json = r#"{
            "trip_id": "T1",
            "route_id": "GEL",
            "route_type": 2,
            "sequence": 4,
            "from_stop": "47648",
            "to_stop": "20314",
            "departure": "14:17:00",
            "arrival": "14:51:00"
        }"#;
        let record: ConnectionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.trip_id.as_str(), "T1");
        assert_eq!(record.mode, Mode::Rail);
        assert_eq!(record.sequence, 4);
        assert_eq!(record.departure, ServiceTime::from_hms(14, 17, 0));
    }

    #[test]
    fn route_type_maps_to_mode() {
        let record = |route_type: u16| {
            format!(
                r#"{{"trip_id": "T1", "route_id": "R", "route_type": {route_type}, "sequence": 1,
                    "from_stop": "A", "to_stop": "B", "departure": "08:00:00", "arrival": "08:05:00"}}"#
            )
        };

        let tram: ConnectionRecord = serde_json::from_str(&record(900)).unwrap();
        assert_eq!(tram.mode, Mode::Tram);
        let ferry: ConnectionRecord = serde_json::from_str(&record(4)).unwrap();
        assert_eq!(ferry.mode, Mode::Ferry);

        let err = serde_json::from_str::<ConnectionRecord>(&record(99)).unwrap_err();
        assert!(err.to_string().contains("unknown route type: 99"), "{err}");
    }

    #[test]
    fn unmapped_route_type_rejects_timetable() {
        let json = r#"{
            "stops": [],
            "connections": [{
                "trip_id": "T1",
                "route_id": "GEL",
                "route_type": 1800,
                "sequence": 1,
                "from_stop": "47648",
                "to_stop": "20314",
                "departure": "14:17:00",
                "arrival": "14:51:00"
            }]
        }"#;
        assert!(TimetableFile::from_json(json).is_err());
    }

    #[test]
    fn deserialize_rejects_empty_ids() {
        let json = r#"{ "from_stop": "", "to_stop": "B", "min_duration_secs": 60 }"#;
        assert!(serde_json::from_str::<TransferRecord>(json).is_err());
    }

    #[test]
    fn timetable_file_builds_network() {
        let json = r#"{
            "stops": [
                {"id": "47648", "name": "Tarneit", "coordinates": {"lat": -37.832, "lon": 144.694}},
                {"id": "20314", "name": "Geelong", "coordinates": {"lat": -38.144, "lon": 144.355}}
            ],
            "connections": [{
                "trip_id": "T1",
                "route_id": "GEL",
                "route_type": 2,
                "sequence": 1,
                "from_stop": "47648",
                "to_stop": "20314",
                "departure": "14:17:00",
                "arrival": "14:51:00"
            }]
        }"#;
        let file = TimetableFile::from_json(json).unwrap();
        assert!(file.transfers.is_empty());

        let network = file.into_network(&RouterConfig::default()).unwrap();
        assert_eq!(network.store.stop_count(), 2);
        assert_eq!(network.store.len(), 1);
    }

    #[test]
    fn timetable_file_with_dangling_stop() {
        let json = r#"{
            "stops": [],
            "connections": [{
                "trip_id": "T1",
                "route_id": "GEL",
                "route_type": 2,
                "sequence": 1,
                "from_stop": "47648",
                "to_stop": "20314",
                "departure": "14:17:00",
                "arrival": "14:51:00"
            }]
        }"#;
        let result = TimetableFile::from_json(json)
            .unwrap()
            .into_network(&RouterConfig::default());
        assert!(matches!(result, Err(TimetableError::UnknownStop(_))));
    }
}
