//! Domain error types.
//!
//! These errors represent validation failures and data inconsistencies
//! in the domain layer. They are distinct from routing and feed errors.

use super::{ServiceTime, StopId};

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Invalid leg construction (e.g., arrival before departure)
    #[error("invalid leg: {0}")]
    InvalidLeg(&'static str),

    /// Consecutive legs don't share a stop
    #[error("legs do not connect: {0} then {1}")]
    Discontinuous(StopId, StopId),

    /// A leg departs before the previous one arrives
    #[error("leg departing {departure} starts before previous arrival {arrival}")]
    LegsOutOfOrder {
        arrival: ServiceTime,
        departure: ServiceTime,
    },

    /// The journey's endpoints disagree with its legs
    #[error("journey endpoint mismatch: expected {expected}, legs give {actual}")]
    EndpointMismatch { expected: StopId, actual: StopId },

    /// Journey has no legs
    #[error("journey must have at least one leg")]
    EmptyJourney,
}
