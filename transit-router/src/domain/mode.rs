//! Transport modes.
//!
//! Feeds identify modes with numeric route types, using both the basic
//! scheme (0-12) and the extended scheme (100-1799). Both are mapped onto a
//! closed set of modes at ingestion; anything unrecognised is rejected there
//! instead of leaking into routing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned for a route type with no known mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown route type: {0}")]
pub struct UnknownRouteType(pub u16);

/// A transport mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Rail,
    Tram,
    Bus,
    Ferry,
    /// Walking between stops (transfers and timetabled walk links).
    Walk,
}

impl Mode {
    /// All modes, in declaration order.
    pub const ALL: [Mode; 5] = [Mode::Rail, Mode::Tram, Mode::Bus, Mode::Ferry, Mode::Walk];

    /// Map a feed route type onto a mode.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::domain::Mode;
    ///
    /// assert_eq!(Mode::from_route_type(2).unwrap(), Mode::Rail);
    /// assert_eq!(Mode::from_route_type(0).unwrap(), Mode::Tram);
    /// assert_eq!(Mode::from_route_type(700).unwrap(), Mode::Bus);
    /// assert!(Mode::from_route_type(99).is_err());
    /// ```
    pub fn from_route_type(route_type: u16) -> Result<Mode, UnknownRouteType> {
        let mode = match route_type {
            0 | 5 => Mode::Tram,
            1 | 2 | 6 | 7 | 12 => Mode::Rail,
            3 | 11 => Mode::Bus,
            4 => Mode::Ferry,
            100..=199 | 400..=499 => Mode::Rail,
            200..=299 | 700..=799 | 800..=899 => Mode::Bus,
            900..=999 => Mode::Tram,
            1000..=1099 | 1200..=1299 => Mode::Ferry,
            _ => return Err(UnknownRouteType(route_type)),
        };
        Ok(mode)
    }

    /// Human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            Mode::Rail => "Rail",
            Mode::Tram => "Tram",
            Mode::Bus => "Bus",
            Mode::Ferry => "Ferry",
            Mode::Walk => "Walk",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when parsing an unrecognised mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode: {0}")]
pub struct UnknownMode(String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.display_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

/// A set of allowed modes.
///
/// # Examples
///
/// ```
/// use transit_router::domain::{Mode, ModeSet};
///
/// let rail_and_tram: ModeSet = [Mode::Rail, Mode::Tram].into_iter().collect();
/// assert!(rail_and_tram.contains(Mode::Rail));
/// assert!(!rail_and_tram.contains(Mode::Bus));
/// assert!(ModeSet::all().contains(Mode::Walk));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModeSet(u8);

impl ModeSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every mode.
    pub fn all() -> Self {
        Mode::ALL.into_iter().collect()
    }

    /// Returns a copy with `mode` added.
    pub fn with(self, mode: Mode) -> Self {
        Self(self.0 | mode.bit())
    }

    /// Returns a copy with `mode` removed.
    pub fn without(self, mode: Mode) -> Self {
        Self(self.0 & !mode.bit())
    }

    pub fn contains(&self, mode: Mode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if any vehicle mode (anything but walking) is allowed.
    pub fn has_vehicle_mode(&self) -> bool {
        self.without(Mode::Walk).0 != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Mode> + '_ {
        Mode::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

impl FromIterator<Mode> for ModeSet {
    fn from_iter<I: IntoIterator<Item = Mode>>(iter: I) -> Self {
        iter.into_iter().fold(ModeSet::empty(), ModeSet::with)
    }
}

impl fmt::Debug for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for ModeSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ModeSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let modes = Vec::<Mode>::deserialize(deserializer)?;
        Ok(modes.into_iter().collect())
    }
}
