//! Transfer admissibility.
//!
//! Decides whether a passenger can get from one vehicle to the next:
//! staying on the same trip is always fine; anything else needs the
//! transfer's minimum duration, and walks beyond the walking limit are
//! never allowed.

use crate::domain::{Leg, StopId};
use crate::timetable::{Connection, Network, StopIdx};

/// The outcome of checking one boundary between vehicles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferVerdict {
    /// Same trip, same mode: the passenger stays on board.
    Continuation,
    /// A change with enough time.
    Admissible { available_secs: i64, required_secs: u32 },
    /// A change with too little time.
    TooShort { available_secs: i64, required_secs: u32 },
    /// The stops are too far apart to walk.
    TooFar { distance_m: f64 },
}

impl TransferVerdict {
    pub fn is_admissible(&self) -> bool {
        matches!(
            self,
            TransferVerdict::Continuation | TransferVerdict::Admissible { .. }
        )
    }
}

/// Checks transfers against one network's transfer table.
#[derive(Debug, Clone, Copy)]
pub struct TransferValidator<'a> {
    network: &'a Network,
}

impl<'a> TransferValidator<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self { network }
    }

    /// Check the move from connection `a` to connection `b`.
    ///
    /// A mode change is a transfer even when the feed gives both hops the
    /// same trip id; the store keeps such hops in separate trip runs.
    pub fn check_connections(&self, a: &Connection, b: &Connection) -> TransferVerdict {
        if a.trip == b.trip && a.mode == b.mode && a.to == b.from {
            return TransferVerdict::Continuation;
        }
        let available_secs = b.departure.secs_since(a.arrival);
        self.check_indices(a.to, b.from, available_secs)
    }

    /// Check the boundary between two transit legs, using expected times.
    ///
    /// Returns `None` if either stop is not in the network.
    pub fn check_legs(&self, a: &Leg, b: &Leg) -> Option<TransferVerdict> {
        if a.trip_id().is_some() && a.trip_id() == b.trip_id() && a.mode() == b.mode() {
            return Some(TransferVerdict::Continuation);
        }
        let available_secs = b.expected_departure().secs_since(a.expected_arrival());
        self.check_stops(a.to_stop(), b.from_stop(), available_secs)
    }

    /// Check a change from `from` to `to` with `available_secs` to spare.
    pub fn check_stops(
        &self,
        from: &StopId,
        to: &StopId,
        available_secs: i64,
    ) -> Option<TransferVerdict> {
        let store = &self.network.store;
        let from = store.stop_index(from)?;
        let to = store.stop_index(to)?;
        Some(self.check_indices(from, to, available_secs))
    }

    fn check_indices(&self, from: StopIdx, to: StopIdx, available_secs: i64) -> TransferVerdict {
        let transfers = &self.network.transfers;
        let Some(rule) = transfers.rule(from, to) else {
            return TransferVerdict::TooFar {
                distance_m: transfers.distance_m(from, to),
            };
        };

        let required_secs = rule.duration_secs;
        if available_secs >= i64::from(required_secs) {
            TransferVerdict::Admissible {
                available_secs,
                required_secs,
            }
        } else {
            TransferVerdict::TooShort {
                available_secs,
                required_secs,
            }
        }
    }
}
