//! The query entry point.
//!
//! A [`Router`] answers "how do I get from A to B, leaving after T?" by
//! running earliest-arrival scans from successive departure floors, turning
//! each scan's per-transfer-count optima into journeys, overlaying realtime
//! data and ranking what is left.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::domain::{Advisory, Journey, ModeSet, ServiceTime, StopId};
use crate::realtime::{DelaySnapshot, RealtimeSource, apply_realtime};
use crate::timetable::{Network, NetworkHandle};

use super::config::RouterConfig;
use super::csa::{self, ScanRequest};
use super::rank::{Criterion, deduplicate, rank_journeys, remove_dominated};
use super::reconstruct::{InvariantViolation, reconstruct};

/// Error from journey search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// The stop is not in the current network
    #[error("unknown stop: {0}")]
    UnknownStop(StopId),

    /// Invalid search request
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    /// The query hit an internal inconsistency and was abandoned
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// Request for journey search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub origin: StopId,
    pub destination: StopId,
    /// Earliest departure from the origin.
    pub departure: ServiceTime,
    pub allowed_modes: ModeSet,
    /// Overrides the configured transfer limit.
    pub max_transfers: Option<usize>,
    pub optimize_for: Criterion,
    /// Keep journeys invalidated by realtime data.
    pub include_invalid: bool,
    /// Drop journeys beaten on every criterion by another.
    pub pareto: bool,
}

impl SearchRequest {
    /// A request allowing every mode, ranked by arrival time.
    pub fn new(origin: StopId, destination: StopId, departure: ServiceTime) -> Self {
        Self {
            origin,
            destination,
            departure,
            allowed_modes: ModeSet::all(),
            max_transfers: None,
            optimize_for: Criterion::default(),
            include_invalid: false,
            pareto: false,
        }
    }

    pub fn with_modes(mut self, modes: ModeSet) -> Self {
        self.allowed_modes = modes;
        self
    }

    pub fn with_max_transfers(mut self, max_transfers: usize) -> Self {
        self.max_transfers = Some(max_transfers);
        self
    }

    pub fn optimize_for(mut self, criterion: Criterion) -> Self {
        self.optimize_for = criterion;
        self
    }

    pub fn include_invalid(mut self, include: bool) -> Self {
        self.include_invalid = include;
        self
    }

    pub fn pareto(mut self, pareto: bool) -> Self {
        self.pareto = pareto;
        self
    }

    /// Validate the search request.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.allowed_modes.is_empty() {
            return Err(SearchError::InvalidRequest(
                "no transport modes allowed".to_string(),
            ));
        }
        if self.departure.is_never() {
            return Err(SearchError::InvalidRequest(
                "departure time is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of journey search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Found journeys, ranked best-first.
    pub journeys: Vec<Journey>,

    /// Connections examined over all scans.
    pub connections_scanned: usize,

    /// Number of scans run.
    pub rounds: usize,

    /// False if the search was cancelled before finishing.
    pub complete: bool,
}

impl SearchResult {
    /// Create an empty result.
    pub fn empty() -> Self {
        Self {
            journeys: Vec::new(),
            connections_scanned: 0,
            rounds: 0,
            complete: true,
        }
    }
}

/// Journey planner over the current network.
#[derive(Debug, Clone)]
pub struct Router {
    network: NetworkHandle,
    config: RouterConfig,
}

impl Router {
    pub fn new(network: NetworkHandle, config: RouterConfig) -> Self {
        Self { network, config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The network queries started now would use.
    pub fn network(&self) -> Arc<Network> {
        self.network.current()
    }

    /// Find journeys, overlaying `realtime` if given.
    ///
    /// No route is not an error: the result is simply empty.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - the request is invalid
    /// - origin or destination is not in the network
    /// - reconstruction hits an internal inconsistency
    pub fn find_journeys(
        &self,
        request: &SearchRequest,
        realtime: Option<&DelaySnapshot>,
    ) -> Result<SearchResult, SearchError> {
        self.search(request, realtime, None)
    }

    /// As [`Router::find_journeys`], stopping early once `cancel` is set.
    ///
    /// A cancelled search returns what it found so far, marked incomplete.
    pub fn find_journeys_cancellable(
        &self,
        request: &SearchRequest,
        realtime: Option<&DelaySnapshot>,
        cancel: &AtomicBool,
    ) -> Result<SearchResult, SearchError> {
        self.search(request, realtime, Some(cancel))
    }

    /// Find journeys with the snapshot currently offered by `source`.
    ///
    /// If the source fails, the search runs on scheduled times and each
    /// journey carries [`Advisory::RealtimeUnavailable`].
    pub fn find_journeys_live<S>(
        &self,
        request: &SearchRequest,
        source: &S,
    ) -> Result<SearchResult, SearchError>
    where
        S: RealtimeSource + ?Sized,
    {
        match source.snapshot() {
            Ok(snapshot) => self.find_journeys(request, Some(&snapshot)),
            Err(error) => {
                warn!(%error, "Realtime unavailable, using scheduled times");
                let mut result = self.find_journeys(request, None)?;
                for journey in &mut result.journeys {
                    journey.add_advisory(Advisory::RealtimeUnavailable);
                }
                Ok(result)
            }
        }
    }

    /// Answer independent requests in parallel.
    ///
    /// Results are in request order.
    pub fn find_journeys_batch(
        &self,
        requests: &[SearchRequest],
        realtime: Option<&DelaySnapshot>,
    ) -> Vec<Result<SearchResult, SearchError>> {
        requests
            .par_iter()
            .map(|request| self.find_journeys(request, realtime))
            .collect()
    }

    fn search(
        &self,
        request: &SearchRequest,
        realtime: Option<&DelaySnapshot>,
        cancel: Option<&AtomicBool>,
    ) -> Result<SearchResult, SearchError> {
        request.validate()?;

        // One network for the whole query, even if a refresh lands meanwhile
        let network = self.network.current();
        let store = &network.store;
        let origin = store
            .stop_index(&request.origin)
            .ok_or_else(|| SearchError::UnknownStop(request.origin.clone()))?;
        let destination = store
            .stop_index(&request.destination)
            .ok_or_else(|| SearchError::UnknownStop(request.destination.clone()))?;

        if origin == destination {
            debug!(stop = %request.origin, "Origin is the destination");
            return Ok(SearchResult::empty());
        }

        let max_transfers = request.max_transfers.unwrap_or(self.config.max_transfers);
        let window_end = request.departure + self.config.search_window();

        let mut found = Vec::new();
        let mut result = SearchResult::empty();
        let mut floor = request.departure;

        while result.rounds < self.config.max_departure_rounds && floor <= window_end {
            result.rounds += 1;

            let mut scan_request = ScanRequest::new(origin, floor, max_transfers)
                .with_destination(destination)
                .with_modes(request.allowed_modes)
                .with_horizon(floor + self.config.max_journey());
            if let Some(cancel) = cancel {
                scan_request = scan_request.with_cancel(cancel);
            }

            let scan = csa::scan(&network, &scan_request);
            result.connections_scanned += scan.connections_scanned;

            // Each leg count that beats every smaller one is a journey worth
            // offering: it trades one more change for an earlier arrival.
            let mut best = ServiceTime::NEVER;
            let mut earliest_departure: Option<ServiceTime> = None;
            for legs in 1..=scan.max_legs() {
                let arrival = scan.arrival(legs, destination);
                if arrival >= best {
                    continue;
                }
                best = arrival;

                let journey = reconstruct(&network, &scan, destination, legs)?;
                let departure = journey.departure_time();
                if departure > window_end {
                    continue;
                }
                earliest_departure = Some(earliest_departure.map_or(departure, |d| d.min(departure)));
                found.push(journey);
            }

            trace!(
                round = result.rounds,
                %floor,
                scanned = scan.connections_scanned,
                found = found.len(),
                "Departure round"
            );

            if !scan.complete {
                result.complete = false;
                break;
            }
            // Nothing in the window from this floor means nothing from any
            // later one either
            let Some(departure) = earliest_departure else {
                break;
            };
            if found.len() >= self.config.max_results {
                break;
            }
            floor = departure.plus_secs(1);
        }

        let mut journeys = deduplicate(found);
        if let Some(snapshot) = realtime {
            journeys = journeys
                .into_iter()
                .map(|journey| apply_realtime(&network, journey, snapshot))
                .collect();
        }
        if !request.include_invalid {
            journeys.retain(Journey::is_valid);
        }
        if request.pareto {
            journeys = remove_dominated(journeys);
        }
        let mut journeys = rank_journeys(journeys, request.optimize_for);
        journeys.truncate(self.config.max_results);

        debug!(
            origin = %request.origin,
            destination = %request.destination,
            departure = %request.departure,
            rounds = result.rounds,
            scanned = result.connections_scanned,
            journeys = journeys.len(),
            complete = result.complete,
            "Search finished"
        );

        result.journeys = journeys;
        Ok(result)
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
