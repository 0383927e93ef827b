//! Journey ranking for search results.
//!
//! Orders journeys by a chosen [`Criterion`] and prunes the ones no
//! passenger would pick. All comparisons use expected times, so a ranking
//! done after realtime adjustment reflects the delays.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Journey, ServiceTime};

/// What to optimise for when ordering journeys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Earliest arrival; ties by fewer transfers, then shorter duration.
    #[default]
    Arrival,
    /// Shortest time from departure to arrival.
    Duration,
    /// Fewest vehicle changes; ties by shorter duration.
    Transfers,
    /// Least walking between stops; ties by shorter duration.
    Walking,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::Arrival,
        Criterion::Duration,
        Criterion::Transfers,
        Criterion::Walking,
    ];

    /// Compare two journeys, best first.
    pub fn compare(self, a: &Journey, b: &Journey) -> Ordering {
        match self {
            Criterion::Arrival => by_arrival(a, b),
            Criterion::Duration => by_duration(a, b),
            Criterion::Transfers => by_transfers(a, b),
            Criterion::Walking => by_walking(a, b),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Arrival => "arrival",
            Criterion::Duration => "duration",
            Criterion::Transfers => "transfers",
            Criterion::Walking => "walking",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a ranking criterion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ranking criterion: {0}")]
pub struct UnknownCriterion(String);

impl FromStr for Criterion {
    type Err = UnknownCriterion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Criterion::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCriterion(s.to_string()))
    }
}

fn duration_secs(journey: &Journey) -> i64 {
    journey
        .expected_arrival()
        .secs_since(journey.expected_departure())
}

fn by_arrival(a: &Journey, b: &Journey) -> Ordering {
    a.expected_arrival()
        .cmp(&b.expected_arrival())
        .then_with(|| a.transfer_count().cmp(&b.transfer_count()))
        .then_with(|| duration_secs(a).cmp(&duration_secs(b)))
}

fn by_duration(a: &Journey, b: &Journey) -> Ordering {
    duration_secs(a)
        .cmp(&duration_secs(b))
        .then_with(|| a.expected_arrival().cmp(&b.expected_arrival()))
}

fn by_transfers(a: &Journey, b: &Journey) -> Ordering {
    a.transfer_count()
        .cmp(&b.transfer_count())
        .then_with(|| by_duration(a, b))
}

fn by_walking(a: &Journey, b: &Journey) -> Ordering {
    a.walking_distance_m()
        .total_cmp(&b.walking_distance_m())
        .then_with(|| by_duration(a, b))
}

/// Sort journeys best-first by `criterion`.
///
/// The sort is stable: journeys that compare equal keep their input order.
pub fn rank_journeys(mut journeys: Vec<Journey>, criterion: Criterion) -> Vec<Journey> {
    journeys.sort_by(|a, b| criterion.compare(a, b));
    journeys
}

/// Returns true if `a` is at least as good as `b` on arrival, duration,
/// transfers and walking, and strictly better on one of them.
pub fn dominates(a: &Journey, b: &Journey) -> bool {
    let (arr_a, arr_b) = (a.expected_arrival(), b.expected_arrival());
    let (dur_a, dur_b) = (duration_secs(a), duration_secs(b));
    let (tr_a, tr_b) = (a.transfer_count(), b.transfer_count());
    let (walk_a, walk_b) = (a.walking_distance_m(), b.walking_distance_m());

    arr_a <= arr_b
        && dur_a <= dur_b
        && tr_a <= tr_b
        && walk_a <= walk_b
        && (arr_a < arr_b || dur_a < dur_b || tr_a < tr_b || walk_a < walk_b)
}

/// Remove dominated journeys (see [`dominates`]).
///
/// Journeys that tie on every criterion are all kept; use [`deduplicate`]
/// to collapse those.
pub fn remove_dominated(journeys: Vec<Journey>) -> Vec<Journey> {
    if journeys.len() <= 1 {
        return journeys;
    }

    let mut result: Vec<Journey> = Vec::with_capacity(journeys.len());

    for journey in journeys {
        if result.iter().any(|existing| dominates(existing, &journey)) {
            continue;
        }
        result.retain(|existing| !dominates(&journey, existing));
        result.push(journey);
    }

    result
}

/// Collapse journeys with the same departure, arrival and transfer count.
///
/// Of each group the one with the least walking is kept, then the one with
/// fewer legs. The result is ordered by departure.
pub fn deduplicate(mut journeys: Vec<Journey>) -> Vec<Journey> {
    if journeys.len() <= 1 {
        return journeys;
    }

    journeys.sort_by(|a, b| {
        dedup_key(a)
            .cmp(&dedup_key(b))
            .then_with(|| a.walking_distance_m().total_cmp(&b.walking_distance_m()))
            .then_with(|| a.leg_count().cmp(&b.leg_count()))
    });
    journeys.dedup_by(|later, kept| dedup_key(later) == dedup_key(kept));
    journeys
}

fn dedup_key(journey: &Journey) -> (ServiceTime, ServiceTime, usize) {
    (
        journey.expected_departure(),
        journey.expected_arrival(),
        journey.transfer_count(),
    )
}
