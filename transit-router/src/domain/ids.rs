//! Identifier types for stops, trips and routes.
//!
//! Identifiers come from the timetable feed as opaque strings. They are
//! validated once at the ingestion boundary and shared cheaply afterwards.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when parsing an invalid identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    reason: &'static str,
}

fn validate(kind: &'static str, s: &str) -> Result<(), InvalidId> {
    if s.is_empty() {
        return Err(InvalidId {
            kind,
            reason: "must not be empty",
        });
    }
    if s.trim() != s {
        return Err(InvalidId {
            kind,
            reason: "must not have surrounding whitespace",
        });
    }
    if s.chars().any(char::is_control) {
        return Err(InvalidId {
            kind,
            reason: "must not contain control characters",
        });
    }
    Ok(())
}

macro_rules! feed_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Parse an identifier, rejecting empty or padded strings.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                validate($kind, s)?;
                Ok(Self(Arc::from(s)))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                $name::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

feed_id!(
    /// A stop (platform or station) identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::domain::StopId;
    ///
    /// let tarneit = StopId::parse("47648").unwrap();
    /// assert_eq!(tarneit.as_str(), "47648");
    ///
    /// assert!(StopId::parse("").is_err());
    /// assert!(StopId::parse(" 47648").is_err());
    /// ```
    StopId,
    "stop"
);

feed_id!(
    /// A trip identifier: one vehicle's run of a route.
    TripId,
    "trip"
);

feed_id!(
    /// A route (line) identifier.
    RouteId,
    "route"
);
