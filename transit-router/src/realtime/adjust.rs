//! Applying a delay snapshot to a planned journey.

use tracing::warn;

use crate::domain::{Advisory, Journey, ServiceTime};
use crate::planner::{TransferValidator, TransferVerdict};
use crate::timetable::Network;

use super::DelaySnapshot;

/// Overlay realtime delays and cancellations on `journey`.
///
/// Cancelled legs stay in the journey, marked cancelled; the journey is
/// invalidated with an advisory naming the trip. Delayed legs get realtime
/// times, transfer legs are re-timed from their neighbours, and every change
/// between vehicles is checked again against the transfer rules.
///
/// The journey does not remember having been adjusted: apply each snapshot
/// once.
pub fn apply_realtime(network: &Network, mut journey: Journey, snapshot: &DelaySnapshot) -> Journey {
    let mut advisories = Vec::new();

    for leg in journey.legs_mut().iter_mut().filter(|l| l.is_transit()) {
        // Transit legs always carry both
        let (Some(trip), Some(route)) = (leg.trip_id(), leg.route_id()) else {
            continue;
        };
        let Some(update) = snapshot.get(trip) else {
            continue;
        };

        if update.cancelled {
            let advisory = Advisory::TripCancelled {
                trip_id: trip.clone(),
                route_id: route.clone(),
            };
            leg.mark_cancelled();
            if !advisories.contains(&advisory) {
                advisories.push(advisory);
            }
            continue;
        }

        let departure_delay = update.departure_delay_at(leg.from_stop());
        let arrival_delay = update.arrival_delay_at(leg.to_stop());
        let departure = leg.scheduled_departure().offset_by(departure_delay);
        let arrival = leg.scheduled_arrival().offset_by(arrival_delay).max(departure);
        leg.set_realtime(departure, arrival, arrival_delay);
    }

    retime_transfers(&mut journey);
    advisories.extend(check_transfers(network, &journey));

    let has_realtime = journey.legs().iter().any(|l| l.has_realtime_data());
    journey.set_has_realtime_data(has_realtime);
    for advisory in advisories {
        journey.add_advisory(advisory);
    }

    if !journey.is_valid() {
        warn!(
            origin = %journey.origin(),
            destination = %journey.destination(),
            departure = %journey.departure_time(),
            snapshot = snapshot.version,
            "Journey invalidated by realtime data"
        );
    }
    journey
}

/// Move transfer legs along with the vehicles around them.
///
/// A transfer follows the arrival of the leg before it; a walk that starts
/// the journey ends at the first boarding instead.
fn retime_transfers(journey: &mut Journey) {
    let legs = journey.legs();
    let shifted: Vec<(usize, ServiceTime)> = legs
        .iter()
        .enumerate()
        .filter(|(_, leg)| leg.is_transfer())
        .filter_map(|(i, leg)| {
            let span = leg.scheduled_arrival().secs_since(leg.scheduled_departure());
            let span = u32::try_from(span).unwrap_or(0);
            let departure = match i.checked_sub(1) {
                Some(prev) => legs[prev].expected_arrival(),
                None => legs.get(i + 1)?.expected_departure().minus_secs(span),
            };
            (departure != leg.scheduled_departure()).then_some((i, departure))
        })
        .collect();

    let legs = journey.legs_mut();
    for (i, departure) in shifted {
        let leg = &mut legs[i];
        let span = leg.scheduled_arrival().secs_since(leg.scheduled_departure());
        let shift = departure.secs_since(leg.scheduled_departure());
        let arrival = departure.plus_secs(u32::try_from(span).unwrap_or(0));
        leg.set_realtime(departure, arrival, i32::try_from(shift).unwrap_or(i32::MAX));
    }
}

/// Check each change between consecutive transit legs on expected times.
fn check_transfers(network: &Network, journey: &Journey) -> Vec<Advisory> {
    let validator = TransferValidator::new(network);
    let transit: Vec<_> = journey.transit_legs().collect();

    transit
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let Some(verdict) = validator.check_legs(a, b) else {
                warn!(
                    from = %a.to_stop(),
                    to = %b.from_stop(),
                    "Cannot check transfer between stops missing from the network"
                );
                return None;
            };
            match verdict {
                TransferVerdict::Continuation | TransferVerdict::Admissible { .. } => None,
                TransferVerdict::TooShort {
                    available_secs,
                    required_secs,
                } => Some(Advisory::TransferMissed {
                    at: a.to_stop().clone(),
                    available_secs,
                    required_secs,
                }),
                TransferVerdict::TooFar { distance_m } => Some(Advisory::TransferTooFar {
                    from: a.to_stop().clone(),
                    to: b.from_stop().clone(),
                    distance_m,
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Leg, Mode, RouteId, StopId, TripId};
    use crate::realtime::{StopDelay, TripUpdate};
    use crate::testing::{reference_network, stop_id, time};

    fn trip(s: &str) -> TripId {
        TripId::parse(s).unwrap()
    }

    fn ride(trip_id: &str, from: &str, to: &str, dep: &str, arr: &str, stops: usize) -> Leg {
        Leg::transit(
            Mode::Rail,
            stop_id(from),
            stop_id(to),
            trip(trip_id),
            RouteId::parse(&format!("R-{trip_id}")).unwrap(),
            time(dep),
            time(arr),
            stops,
        )
        .unwrap()
    }

    /// Tarneit to Waurn Ponds, changing at Geelong.
    fn via_geelong() -> Journey {
        let legs = vec![
            ride("GEL-1417", "47648", "20314", "14:17:00", "14:51:00", 3),
            ride("WPD-1454", "20314", "47641", "14:54:00", "15:08:00", 2),
        ];
        Journey::from_transit_legs(time("14:00:00"), legs, |from: &StopId, to: &StopId| {
            (from == to).then_some((120, 0.0))
        })
        .unwrap()
    }

    fn coach() -> Journey {
        let leg = ride("COACH-1405", "47648", "47641", "14:05:00", "15:30:00", 2);
        Journey::new(stop_id("47648"), stop_id("47641"), time("14:00:00"), vec![leg]).unwrap()
    }

    #[test]
    fn empty_snapshot_changes_nothing() {
        let network = reference_network();
        let journey = apply_realtime(&network, via_geelong(), &DelaySnapshot::new(1));

        assert!(journey.is_valid());
        assert!(!journey.has_realtime_data());
        assert!(journey.advisories().is_empty());
        assert_eq!(journey.expected_arrival(), time("15:08:00"));
    }

    #[test]
    fn delay_shifts_leg_times() {
        let network = reference_network();
        let snapshot = DelaySnapshot::new(1).with_update(trip("WPD-1454"), TripUpdate::delayed(120));
        let journey = apply_realtime(&network, via_geelong(), &snapshot);

        assert!(journey.is_valid());
        assert!(journey.has_realtime_data());
        let last = &journey.legs()[2];
        assert_eq!(last.expected_departure(), time("14:56:00"));
        assert_eq!(last.expected_arrival(), time("15:10:00"));
        assert_eq!(last.delay_seconds(), 120);
        assert_eq!(journey.total_delay_seconds(), 120);
        // Scheduled times are kept
        assert_eq!(journey.arrival_time(), time("15:08:00"));
    }

    #[test]
    fn delay_breaks_connection() {
        let network = reference_network();
        let snapshot = DelaySnapshot::new(1).with_update(trip("GEL-1417"), TripUpdate::delayed(120));
        let journey = apply_realtime(&network, via_geelong(), &snapshot);

        assert!(!journey.is_valid());
        assert_eq!(
            journey.advisories(),
            &[Advisory::TransferMissed {
                at: stop_id("20314"),
                available_secs: 60,
                required_secs: 120,
            }]
        );

        // The change follows the late arrival
        let change = &journey.legs()[1];
        assert_eq!(change.expected_departure(), time("14:53:00"));
        assert_eq!(change.expected_arrival(), time("14:55:00"));
    }

    #[test]
    fn stop_delay_takes_precedence() {
        let network = reference_network();
        let update = TripUpdate::delayed(300).with_stop_delay(
            stop_id("20314"),
            StopDelay {
                arrival: Some(0),
                departure: None,
            },
        );
        let snapshot = DelaySnapshot::new(1).with_update(trip("GEL-1417"), update);
        let journey = apply_realtime(&network, via_geelong(), &snapshot);

        let first = &journey.legs()[0];
        assert_eq!(first.expected_departure(), time("14:22:00"));
        assert_eq!(first.expected_arrival(), time("14:51:00"));
        assert!(journey.is_valid());
    }

    #[test]
    fn cancelled_single_leg_is_invalid() {
        let network = reference_network();
        let snapshot = DelaySnapshot::new(1).with_update(trip("COACH-1405"), TripUpdate::cancelled());
        let journey = apply_realtime(&network, coach(), &snapshot);

        assert!(!journey.is_valid());
        assert_eq!(journey.leg_count(), 1);
        assert!(journey.legs()[0].is_cancelled());
        assert!(journey.has_realtime_data());
        assert_eq!(journey.advisories().len(), 1);
        let message = journey.advisories()[0].to_string();
        assert!(message.contains("COACH-1405"), "{message}");
        assert!(message.contains("R-COACH-1405"), "{message}");
    }

    #[test]
    fn cancellation_never_drops_legs() {
        let network = reference_network();
        let snapshot = DelaySnapshot::new(1)
            .with_update(trip("GEL-1417"), TripUpdate::cancelled())
            .with_update(trip("WPD-1454"), TripUpdate::delayed(60));
        let journey = apply_realtime(&network, via_geelong(), &snapshot);

        assert!(!journey.is_valid());
        assert_eq!(journey.leg_count(), 3);
        assert!(journey.legs()[0].is_cancelled());
        assert!(!journey.legs()[2].is_cancelled());
        assert!(matches!(
            journey.advisories()[0],
            Advisory::TripCancelled { ref trip_id, .. } if trip_id.as_str() == "GEL-1417"
        ));
    }

    #[test]
    fn early_running_keeps_transfer() {
        let network = reference_network();
        let snapshot = DelaySnapshot::new(1).with_update(trip("GEL-1417"), TripUpdate::delayed(-60));
        let journey = apply_realtime(&network, via_geelong(), &snapshot);

        assert!(journey.is_valid());
        assert_eq!(journey.transfer_wait_times(), vec![240]);
    }
}
