//! Errors raised while building a timetable.

use crate::domain::{ServiceTime, StopId, TripId};

/// Errors from building the connection store or transfer table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimetableError {
    /// A connection or transfer references a stop that was not loaded
    #[error("unknown stop: {0}")]
    UnknownStop(StopId),

    /// The same stop id appears twice
    #[error("duplicate stop: {0}")]
    DuplicateStop(StopId),

    /// A stop has coordinates out of range
    #[error("stop {0} has invalid coordinates")]
    InvalidCoordinates(StopId),

    /// A connection arrives before it departs
    #[error("trip {trip} sequence {sequence}: arrival {arrival} before departure {departure}")]
    NegativeDuration {
        trip: TripId,
        sequence: u32,
        departure: ServiceTime,
        arrival: ServiceTime,
    },

    /// A trip repeats a sequence number or goes back in time
    #[error("trip {trip} out of order at sequence {sequence}")]
    TripOutOfOrder { trip: TripId, sequence: u32 },

    /// Consecutive hops of a trip do not share a stop
    #[error("trip {trip} breaks at sequence {sequence}: arrives at {arrived}, departs from {departs}")]
    TripDiscontinuous {
        trip: TripId,
        sequence: u32,
        arrived: StopId,
        departs: StopId,
    },

    /// Input asserted to be sorted by departure is not
    #[error("connections not sorted by departure at position {position}")]
    Unsorted { position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TimetableError::UnknownStop(StopId::parse("X1").unwrap());
        assert_eq!(err.to_string(), "unknown stop: X1");

        let err = TimetableError::NegativeDuration {
            trip: TripId::parse("T1").unwrap(),
            sequence: 3,
            departure: ServiceTime::from_hms(10, 5, 0),
            arrival: ServiceTime::from_hms(10, 0, 0),
        };
        assert_eq!(
            err.to_string(),
            "trip T1 sequence 3: arrival 10:00:00 before departure 10:05:00"
        );

        let err = TimetableError::Unsorted { position: 7 };
        assert_eq!(
            err.to_string(),
            "connections not sorted by departure at position 7"
        );
    }
}
