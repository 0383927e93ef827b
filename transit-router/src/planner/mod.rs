//! Journey planning over a timetable network.
//!
//! Answers "how do I get from this stop to that one, leaving after this
//! time?" with a connection scan per departure floor. The scan keeps one
//! label set per number of vehicles ridden, so every transfer count gets its
//! own fastest journey; those are rebuilt from the scan's trace, checked
//! against realtime data and ranked.

mod config;
mod csa;
mod rank;
mod reconstruct;
mod router;
mod validator;

pub use config::RouterConfig;
pub use csa::{Ride, ScanRequest, ScanResult, Step, scan};
pub use rank::{Criterion, UnknownCriterion, deduplicate, dominates, rank_journeys, remove_dominated};
pub use reconstruct::{InvariantViolation, reconstruct};
pub use router::{Router, SearchError, SearchRequest, SearchResult};
pub use validator::{TransferValidator, TransferVerdict};
