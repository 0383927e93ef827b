//! Journey reconstruction.
//!
//! Follows the trace left by a scan backwards from the destination to the
//! origin, then builds the legs front to back: one transit leg per ride and
//! a transfer leg wherever the passenger changes vehicle.

use std::collections::HashSet;

use tracing::error;

use crate::domain::{DomainError, Journey, Leg, ServiceTime, StopId};
use crate::timetable::{Network, StopIdx};

use super::csa::{Ride, ScanResult, Step};

/// Internal inconsistency detected while answering a query.
///
/// These abort the query they occur in; other queries are unaffected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    /// The trace leads back to a label it already visited
    #[error("journey trace revisits stop {stop} after {legs} legs")]
    ReconstructionCycle { stop: StopId, legs: usize },

    /// The trace ends before reaching the origin
    #[error("journey trace breaks at stop {stop} after {legs} legs")]
    ReconstructionGap { stop: StopId, legs: usize },

    /// The legs built from the trace do not form a valid journey
    #[error("reconstructed journey is malformed: {0}")]
    MalformedJourney(#[from] DomainError),
}

#[derive(Debug, Clone, Copy)]
enum Piece {
    Ride(Ride),
    Walk {
        from: StopIdx,
        to: StopIdx,
        duration_secs: u32,
        distance_m: f64,
    },
}

/// Rebuild the journey reaching `destination` with at most `legs` legs.
///
/// # Errors
///
/// Returns an [`InvariantViolation`] if the trace is broken or cyclic. The
/// violation is also logged at error level.
pub fn reconstruct(
    network: &Network,
    scan: &ScanResult,
    destination: StopIdx,
    legs: usize,
) -> Result<Journey, InvariantViolation> {
    let result = trace_back(network, scan, destination, legs)
        .and_then(|pieces| build_journey(network, scan, destination, &pieces));

    if let Err(violation) = &result {
        error!(
            %violation,
            origin = %network.store.stop(scan.origin()).id,
            destination = %network.store.stop(destination).id,
            legs,
            "Journey reconstruction failed"
        );
    }
    result
}

/// Collect the pieces of the journey, origin first.
fn trace_back(
    network: &Network,
    scan: &ScanResult,
    destination: StopIdx,
    legs: usize,
) -> Result<Vec<Piece>, InvariantViolation> {
    let store = &network.store;
    let stop_id = |s: StopIdx| store.stop(s).id.clone();

    let mut pieces = Vec::new();
    let mut visited: HashSet<(usize, StopIdx)> = HashSet::new();
    let mut at = destination;
    let mut level = legs;
    let mut step = scan.arrival_step(legs, destination);

    loop {
        match step {
            Step::Unreached => {
                return Err(InvariantViolation::ReconstructionGap {
                    stop: stop_id(at),
                    legs: level,
                });
            }
            Step::Origin => {
                if at != scan.origin() {
                    return Err(InvariantViolation::ReconstructionGap {
                        stop: stop_id(at),
                        legs: level,
                    });
                }
                break;
            }
            Step::Ride(ride) => {
                let board = store.connection(ride.board);
                let alight = store.connection(ride.alight);
                let consistent = alight.to == at
                    && board.trip == alight.trip
                    && board.hop <= alight.hop
                    && ride.prefix < level;
                if !consistent {
                    return Err(InvariantViolation::ReconstructionGap {
                        stop: stop_id(at),
                        legs: level,
                    });
                }

                pieces.push(Piece::Ride(ride));
                at = board.from;
                level = ride.prefix;
                if !visited.insert((level, at)) {
                    return Err(InvariantViolation::ReconstructionCycle {
                        stop: stop_id(at),
                        legs: level,
                    });
                }
                step = scan.ready_step(level, at);
            }
            Step::Walk {
                from,
                duration_secs,
                distance_m,
                after,
            } => {
                pieces.push(Piece::Walk {
                    from,
                    to: at,
                    duration_secs,
                    distance_m,
                });
                at = from;
                step = after.map_or(Step::Origin, Step::Ride);
            }
        }
    }

    pieces.reverse();
    Ok(merge_rides(network, pieces))
}

/// Join back-to-back rides on the same trip run into one ride.
fn merge_rides(network: &Network, pieces: Vec<Piece>) -> Vec<Piece> {
    let store = &network.store;
    let mut merged: Vec<Piece> = Vec::with_capacity(pieces.len());

    for piece in pieces {
        if let (Some(Piece::Ride(prev)), Piece::Ride(next)) = (merged.last_mut(), piece) {
            let prev_alight = store.connection(prev.alight);
            let next_board = store.connection(next.board);
            if prev_alight.trip == next_board.trip && prev_alight.hop + 1 == next_board.hop {
                prev.alight = next.alight;
                continue;
            }
        }
        merged.push(piece);
    }
    merged
}

fn build_journey(
    network: &Network,
    scan: &ScanResult,
    destination: StopIdx,
    pieces: &[Piece],
) -> Result<Journey, InvariantViolation> {
    let store = &network.store;
    let stop_id = |s: StopIdx| store.stop(s).id.clone();

    let mut legs: Vec<Leg> = Vec::with_capacity(pieces.len() * 2);
    // Where and when the last vehicle was left
    let mut alighted: Option<(StopIdx, ServiceTime)> = None;

    for (i, piece) in pieces.iter().enumerate() {
        match *piece {
            Piece::Walk {
                from,
                to,
                duration_secs,
                distance_m,
            } => {
                let departure = match alighted {
                    Some((_, time)) => time,
                    // A walk that starts the journey ends at the first boarding
                    None => match pieces.get(i + 1) {
                        Some(Piece::Ride(next)) => store
                            .connection(next.board)
                            .departure
                            .minus_secs(duration_secs),
                        _ => scan.departure(),
                    },
                };
                legs.push(Leg::transfer(
                    stop_id(from),
                    stop_id(to),
                    departure,
                    duration_secs,
                    distance_m,
                )?);
                alighted = None;
            }
            Piece::Ride(ride) => {
                let board = store.connection(ride.board);
                let alight = store.connection(ride.alight);

                if let Some((stop, time)) = alighted {
                    let change = network.transfers.change_secs(stop);
                    legs.push(Leg::transfer(stop_id(stop), stop_id(stop), time, change, 0.0)?);
                }

                let trip = store.trip(board.trip);
                legs.push(Leg::transit(
                    board.mode,
                    stop_id(board.from),
                    stop_id(alight.to),
                    trip.id.clone(),
                    trip.route_id.clone(),
                    board.departure,
                    alight.arrival,
                    (alight.hop - board.hop) as usize + 2,
                )?);
                alighted = Some((alight.to, alight.arrival));
            }
        }
    }

    Ok(Journey::new(
        stop_id(scan.origin()),
        stop_id(destination),
        scan.departure(),
        legs,
    )?)
}
