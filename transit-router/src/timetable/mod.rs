//! Timetable data: the connection store and transfer table.
//!
//! A [`Network`] bundles both for one timetable version. It is immutable
//! once built; a [`NetworkHandle`] lets a new version be swapped in while
//! queries on the old one finish undisturbed.

mod error;
mod record;
mod store;
mod transfers;

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::domain::Stop;
use crate::planner::RouterConfig;

pub use error::TimetableError;
pub use record::{ConnectionRecord, TimetableFile, TransferRecord};
pub use store::{Connection, ConnectionStore, StopIdx, TripIdx, TripInfo};
pub use transfers::{Footpath, TransferRule, TransferTable};

/// One timetable version, ready for routing.
#[derive(Debug, Clone)]
pub struct Network {
    pub store: ConnectionStore,
    pub transfers: TransferTable,
}

impl Network {
    /// Build a network from ingestion records.
    pub fn build(
        stops: Vec<Stop>,
        connections: Vec<ConnectionRecord>,
        transfers: &[TransferRecord],
        config: &RouterConfig,
    ) -> Result<Self, TimetableError> {
        let store = ConnectionStore::build(stops, connections)?;
        let transfers = TransferTable::build(&store, transfers, config)?;
        Ok(Self { store, transfers })
    }
}

/// Shared, swappable access to the current network.
///
/// Readers take a cheap `Arc` clone and keep using it for the whole query,
/// so a refresh never changes the data under a running search.
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    inner: Arc<RwLock<Arc<Network>>>,
}

impl NetworkHandle {
    pub fn new(network: Network) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(network))),
        }
    }

    /// The network current at the time of the call.
    pub fn current(&self) -> Arc<Network> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Replace the network. In-flight queries finish on the old one.
    pub fn replace(&self, network: Network) {
        let connections = network.store.len();
        let network = Arc::new(network);

        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = network;
        drop(guard);

        info!(connections, "Network replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, StopId};

    fn network(stop_ids: &[&str]) -> Network {
        let stops = stop_ids
            .iter()
            .map(|s| Stop::new(StopId::parse(s).unwrap(), *s, Coordinates::new(-37.8, 144.9)))
            .collect();
        Network::build(stops, vec![], &[], &RouterConfig::default()).unwrap()
    }

    #[test]
    fn replace_keeps_old_snapshot_alive() {
        let handle = NetworkHandle::new(network(&["A"]));
        let before = handle.current();

        handle.replace(network(&["A", "B"]));

        assert_eq!(before.store.stop_count(), 1);
        assert_eq!(handle.current().store.stop_count(), 2);
    }

    #[test]
    fn clones_share_the_network() {
        let handle = NetworkHandle::new(network(&["A"]));
        let other = handle.clone();

        other.replace(network(&["A", "B", "C"]));
        assert_eq!(handle.current().store.stop_count(), 3);
    }
}
