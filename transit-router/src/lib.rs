//! Multi-modal public transport router.
//!
//! Plans journeys over a timetable of rail, tram, bus and ferry trips with
//! walking transfers, using the connection scan algorithm, and overlays
//! realtime delays and cancellations on the result.

pub mod domain;
pub mod planner;
pub mod realtime;
pub mod timetable;

#[cfg(test)]
mod testing;
