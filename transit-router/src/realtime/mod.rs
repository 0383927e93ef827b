//! Realtime delays and cancellations.
//!
//! The feed poller publishes immutable [`DelaySnapshot`]s to a
//! [`RealtimeFeed`]; queries take whichever snapshot is current when they
//! start and overlay it on their journeys with [`apply_realtime`].

mod adjust;
mod file;
mod snapshot;

pub use adjust::apply_realtime;
pub use file::FileSource;
pub use snapshot::{
    DelaySnapshot, RealtimeError, RealtimeFeed, RealtimeSource, StopDelay, TripUpdate,
};
