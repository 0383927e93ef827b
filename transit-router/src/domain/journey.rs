//! Journey types.
//!
//! A `Journey` is a complete itinerary from origin to destination: transit
//! legs, with transfer legs wherever the passenger changes vehicle.

use std::fmt::Write as _;

use chrono::Duration;
use serde::Serialize;

use super::time::{format_delay, format_duration};
use super::{Advisory, DomainError, Leg, ServiceTime, StopId};

/// A complete journey from origin to destination.
///
/// # Invariants
///
/// - At least one leg
/// - Consecutive legs connect (arrival stop of one = departure stop of next)
/// - Scheduled times never go backwards between legs
/// - The first leg starts at `origin`, the last ends at `destination`
#[derive(Debug, Clone, Serialize)]
pub struct Journey {
    origin: StopId,
    destination: StopId,
    requested_departure: ServiceTime,
    legs: Vec<Leg>,
    valid: bool,
    advisories: Vec<Advisory>,
    has_realtime_data: bool,
}

impl Journey {
    /// Constructs a journey from ordered legs.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - Legs list is empty
    /// - Legs don't connect or go back in time
    /// - The legs don't start at `origin` or end at `destination`
    pub fn new(
        origin: StopId,
        destination: StopId,
        requested_departure: ServiceTime,
        legs: Vec<Leg>,
    ) -> Result<Self, DomainError> {
        let (Some(first), Some(last)) = (legs.first(), legs.last()) else {
            return Err(DomainError::EmptyJourney);
        };

        if first.from_stop() != &origin {
            return Err(DomainError::EndpointMismatch {
                expected: origin,
                actual: first.from_stop().clone(),
            });
        }
        if last.to_stop() != &destination {
            return Err(DomainError::EndpointMismatch {
                expected: destination,
                actual: last.to_stop().clone(),
            });
        }

        for window in legs.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            if prev.to_stop() != next.from_stop() {
                return Err(DomainError::Discontinuous(
                    prev.to_stop().clone(),
                    next.from_stop().clone(),
                ));
            }
            if next.scheduled_departure() < prev.scheduled_arrival() {
                return Err(DomainError::LegsOutOfOrder {
                    arrival: prev.scheduled_arrival(),
                    departure: next.scheduled_departure(),
                });
            }
        }

        Ok(Journey {
            origin,
            destination,
            requested_departure,
            legs,
            valid: true,
            advisories: Vec::new(),
            has_realtime_data: false,
        })
    }

    /// Constructs a journey from transit legs, inserting transfer legs.
    ///
    /// `transfer` gives the minimum transfer duration in seconds and the
    /// walking distance between two stops, or `None` if no transfer is
    /// possible between them.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a transfer is impossible, or as for [`Journey::new`].
    #[cfg(test)]
    pub(crate) fn from_transit_legs<F>(
        requested_departure: ServiceTime,
        legs: Vec<Leg>,
        transfer: F,
    ) -> Result<Self, DomainError>
    where
        F: Fn(&StopId, &StopId) -> Option<(u32, f64)>,
    {
        let (Some(first), Some(last)) = (legs.first(), legs.last()) else {
            return Err(DomainError::EmptyJourney);
        };
        let origin = first.from_stop().clone();
        let destination = last.to_stop().clone();

        let mut with_transfers: Vec<Leg> = Vec::with_capacity(legs.len() * 2);
        for leg in legs {
            if let Some(prev) = with_transfers.last() {
                let from = prev.to_stop().clone();
                let to = leg.from_stop().clone();
                let (secs, distance) = transfer(&from, &to)
                    .ok_or_else(|| DomainError::Discontinuous(from.clone(), to.clone()))?;
                let departure = prev.scheduled_arrival();
                with_transfers.push(Leg::transfer(from, to, departure, secs, distance)?);
            }
            with_transfers.push(leg);
        }

        Journey::new(origin, destination, requested_departure, with_transfers)
    }

    pub fn origin(&self) -> &StopId {
        &self.origin
    }

    pub fn destination(&self) -> &StopId {
        &self.destination
    }

    /// The departure floor the journey was searched with.
    pub fn requested_departure(&self) -> ServiceTime {
        self.requested_departure
    }

    /// Returns all legs in order.
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub(crate) fn legs_mut(&mut self) -> &mut [Leg] {
        &mut self.legs
    }

    /// Returns the transit legs in order.
    pub fn transit_legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.iter().filter(|l| l.is_transit())
    }

    /// Returns the transfer legs in order.
    pub fn transfer_legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.iter().filter(|l| l.is_transfer())
    }

    /// Returns the number of legs, transfers included.
    pub fn leg_count(&self) -> usize {
        self.legs.len()
    }

    /// Returns the number of vehicle changes (transit legs - 1, or 0).
    pub fn transfer_count(&self) -> usize {
        self.transit_legs().count().saturating_sub(1)
    }

    /// Returns true if this is a direct journey (no changes).
    pub fn is_direct(&self) -> bool {
        self.transfer_count() == 0
    }

    /// Scheduled departure time of the first leg.
    pub fn departure_time(&self) -> ServiceTime {
        // Safe: validated non-empty at construction
        self.legs[0].scheduled_departure()
    }

    /// Scheduled arrival time of the last leg.
    pub fn arrival_time(&self) -> ServiceTime {
        self.legs[self.legs.len() - 1].scheduled_arrival()
    }

    /// Departure time, realtime if known.
    pub fn expected_departure(&self) -> ServiceTime {
        self.legs[0].expected_departure()
    }

    /// Arrival time, realtime if known.
    pub fn expected_arrival(&self) -> ServiceTime {
        self.legs[self.legs.len() - 1].expected_arrival()
    }

    /// Returns the total scheduled journey duration.
    pub fn total_duration(&self) -> Duration {
        self.arrival_time()
            .signed_duration_since(self.departure_time())
    }

    /// Delay at the destination relative to the schedule, in seconds.
    pub fn total_delay_seconds(&self) -> i64 {
        self.expected_arrival().secs_since(self.arrival_time())
    }

    /// Returns the total walking distance in metres.
    pub fn walking_distance_m(&self) -> f64 {
        self.transfer_legs().map(Leg::walking_distance_m).sum()
    }

    /// Waiting time at each change, in seconds: from alighting one vehicle
    /// to departing on the next, using expected times.
    pub fn transfer_wait_times(&self) -> Vec<i64> {
        let transit: Vec<&Leg> = self.transit_legs().collect();
        transit
            .windows(2)
            .map(|w| {
                w[1].expected_departure()
                    .secs_since(w[0].expected_arrival())
            })
            .collect()
    }

    /// Whether the journey is still usable.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn has_realtime_data(&self) -> bool {
        self.has_realtime_data
    }

    /// Attach an advisory; invalidating advisories also mark the journey
    /// invalid.
    pub fn add_advisory(&mut self, advisory: Advisory) {
        if advisory.invalidates() {
            self.valid = false;
        }
        self.advisories.push(advisory);
    }

    pub(crate) fn set_has_realtime_data(&mut self, value: bool) {
        self.has_realtime_data = value;
    }

    /// Format the journey as a multi-line summary.
    ///
    /// `stop_name` resolves stop identifiers to display names; unresolved
    /// stops are shown by identifier.
    pub fn format_summary<'a, F>(&self, stop_name: F) -> String
    where
        F: Fn(&StopId) -> Option<&'a str>,
    {
        let name = |id: &StopId| stop_name(id).map(str::to_string).unwrap_or_else(|| id.to_string());
        let mut out = String::new();

        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "Journey: {} -> {}",
            name(&self.origin),
            name(&self.destination)
        );
        let _ = writeln!(out, "Departure: {}", self.expected_departure());
        let _ = writeln!(out, "Arrival: {}", self.expected_arrival());
        let _ = writeln!(out, "Duration: {}", format_duration(self.total_duration()));
        let _ = writeln!(out, "Transfers: {}", self.transfer_count());
        if !self.valid {
            let _ = writeln!(out, "Status: NOT VALID");
        }
        for advisory in &self.advisories {
            let _ = writeln!(out, "Advisory: {advisory}");
        }

        for (i, leg) in self.legs.iter().enumerate() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Leg {} ({}):", i + 1, leg.mode());
            let _ = writeln!(
                out,
                "  {} -> {}",
                name(leg.from_stop()),
                name(leg.to_stop())
            );
            let _ = writeln!(
                out,
                "  Depart: {}  Arrive: {}",
                leg.expected_departure(),
                leg.expected_arrival()
            );
            if let Some(route) = leg.route_id() {
                let _ = writeln!(out, "  Route: {route}");
            }
            if leg.is_transit() {
                let _ = writeln!(out, "  Stops: {}", leg.stop_count());
            } else if leg.walking_distance_m() > 0.0 {
                let _ = writeln!(out, "  Walk: {:.0}m", leg.walking_distance_m());
            }
            if leg.is_cancelled() {
                let _ = writeln!(out, "  CANCELLED");
            } else if leg.has_realtime_data() {
                let _ = writeln!(out, "  Realtime: {}", format_delay(leg.delay_seconds()));
            }
        }

        out
    }
}
