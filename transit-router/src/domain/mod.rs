//! Domain types for the transit router.
//!
//! This module contains the core domain model: identifiers, service times,
//! modes, stops, legs and journeys. Types enforce their invariants at
//! construction time, so code that receives them can trust their validity.

mod advisory;
mod error;
mod ids;
mod journey;
mod leg;
mod mode;
mod stop;
mod time;

pub use advisory::Advisory;
pub use error::DomainError;
pub use ids::{InvalidId, RouteId, StopId, TripId};
pub use journey::Journey;
pub use leg::{Leg, LegKind};
pub use mode::{Mode, ModeSet, UnknownMode, UnknownRouteType};
pub use stop::{Coordinates, Stop};
pub use time::{ServiceTime, TimeError, format_delay, format_duration};
