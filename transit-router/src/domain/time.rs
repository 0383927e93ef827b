//! Service time handling.
//!
//! Timetables express times as "HH:MM:SS" past a reference midnight (the
//! start of the service day). Hours may exceed 23 for services that run past
//! midnight, so a plain wall-clock time cannot represent them. This module
//! provides a compact seconds-based type with parsing, display and
//! arithmetic against `chrono::Duration`.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};

const SECS_PER_DAY: u32 = 24 * 60 * 60;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of the service day, in seconds past the reference midnight.
///
/// Values beyond 24 hours are valid and denote post-midnight running of the
/// same service day.
///
/// # Examples
///
/// ```
/// use transit_router::domain::ServiceTime;
///
/// let t = ServiceTime::parse("14:17:00").unwrap();
/// assert_eq!(t.as_secs(), 14 * 3600 + 17 * 60);
/// assert_eq!(t.to_string(), "14:17:00");
///
/// // Post-midnight running keeps counting hours
/// let late = ServiceTime::parse("25:10:00").unwrap();
/// assert_eq!(late.to_string(), "25:10:00");
/// assert!(late > t);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServiceTime(u32);

impl ServiceTime {
    /// The unreachable time, used as "infinity" by the router.
    pub const NEVER: ServiceTime = ServiceTime(u32::MAX);

    /// Create a time from seconds past the reference midnight.
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Create a time from hours, minutes and seconds.
    ///
    /// Hours are not limited to 0-23.
    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self(hours * 3600 + minutes * 60 + seconds)
    }

    /// Parse "HH:MM:SS" (or "H:MM:SS"); hours may exceed 23.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_router::domain::ServiceTime;
    ///
    /// assert!(ServiceTime::parse("00:00:00").is_ok());
    /// assert!(ServiceTime::parse("7:05:30").is_ok());
    /// assert!(ServiceTime::parse("26:00:00").is_ok());
    ///
    /// assert!(ServiceTime::parse("14:30").is_err());
    /// assert!(ServiceTime::parse("14:60:00").is_err());
    /// assert!(ServiceTime::parse("ab:cd:ef").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.trim().split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new("expected HH:MM:SS format"));
        };

        if h.is_empty() || h.len() > 3 {
            return Err(TimeError::new("invalid hour digits"));
        }
        let hours = parse_digits(h).ok_or_else(|| TimeError::new("invalid hour digits"))?;

        if m.len() != 2 {
            return Err(TimeError::new("minutes must be two digits"));
        }
        let minutes = parse_digits(m).ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minutes > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        if sec.len() != 2 {
            return Err(TimeError::new("seconds must be two digits"));
        }
        let seconds = parse_digits(sec).ok_or_else(|| TimeError::new("invalid second digits"))?;
        if seconds > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        Ok(Self::from_hms(hours, minutes, seconds))
    }

    /// Returns the number of seconds past the reference midnight.
    pub const fn as_secs(self) -> u32 {
        self.0
    }

    /// Returns true for the unreachable sentinel.
    pub const fn is_never(self) -> bool {
        self.0 == u32::MAX
    }

    /// Add a number of seconds, saturating at [`ServiceTime::NEVER`].
    pub fn plus_secs(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Subtract a number of seconds, saturating at the reference midnight.
    pub fn minus_secs(self, secs: u32) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Shift by a signed number of seconds, clamping at midnight.
    ///
    /// Used for realtime delays, which may be negative (running early).
    pub fn offset_by(self, secs: i32) -> Self {
        let shifted = i64::from(self.0) + i64::from(secs);
        Self(shifted.clamp(0, i64::from(u32::MAX - 1)) as u32)
    }

    /// Signed difference `self - earlier`.
    pub fn signed_duration_since(self, earlier: ServiceTime) -> Duration {
        Duration::seconds(i64::from(self.0) - i64::from(earlier.0))
    }

    /// Signed difference `self - earlier` in whole seconds.
    pub fn secs_since(self, earlier: ServiceTime) -> i64 {
        i64::from(self.0) - i64::from(earlier.0)
    }

    /// Wall-clock time of day, wrapping past midnight.
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(self.0 % SECS_PER_DAY, 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Number of whole days past the reference midnight.
    pub fn day_offset(self) -> u32 {
        self.0 / SECS_PER_DAY
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl Add<Duration> for ServiceTime {
    type Output = ServiceTime;

    fn add(self, rhs: Duration) -> Self::Output {
        let secs = rhs.num_seconds().clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        self.offset_by(secs)
    }
}

impl Sub for ServiceTime {
    type Output = Duration;

    fn sub(self, rhs: ServiceTime) -> Self::Output {
        self.signed_duration_since(rhs)
    }
}

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            f.write_str("ServiceTime(never)")
        } else {
            write!(f, "ServiceTime({self})")
        }
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_never() {
            return f.write_str("--:--:--");
        }
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}

impl Serialize for ServiceTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ServiceTime::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Format a duration in minutes as "45m", "1h" or "1h 5m".
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{hours}h")
    }
}

/// Describe a realtime delay: "On time", "5 min delay" or "2 min early".
///
/// Deviations under a minute count as on time.
pub fn format_delay(delay_seconds: i32) -> String {
    let mins = delay_seconds.unsigned_abs() / 60;
    if mins == 0 {
        "On time".to_string()
    } else if delay_seconds > 0 {
        format!("{mins} min delay")
    } else {
        format!("{mins} min early")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_times() {
        assert_eq!(ServiceTime::parse("00:00:00").unwrap().as_secs(), 0);
        assert_eq!(ServiceTime::parse("14:30:15").unwrap().as_secs(), 52215);
        assert_eq!(ServiceTime::parse("7:05:00").unwrap().as_secs(), 25500);
        assert_eq!(ServiceTime::parse("24:00:00").unwrap().as_secs(), 86400);
        assert_eq!(ServiceTime::parse(" 08:00:00 ").unwrap().as_secs(), 28800);
    }

    #[test]
    fn reject_malformed() {
        assert!(ServiceTime::parse("").is_err());
        assert!(ServiceTime::parse("14:30").is_err());
        assert!(ServiceTime::parse("14:30:00:00").is_err());
        assert!(ServiceTime::parse("14:3:00").is_err());
        assert!(ServiceTime::parse("14:30:0").is_err());
        assert!(ServiceTime::parse("14:60:00").is_err());
        assert!(ServiceTime::parse("14:00:60").is_err());
        assert!(ServiceTime::parse("-1:00:00").is_err());
        assert!(ServiceTime::parse("+1:00:00").is_err());
        assert!(ServiceTime::parse("1000:00:00").is_err());
    }

    #[test]
    fn display_pads_and_keeps_overflow_hours() {
        assert_eq!(ServiceTime::from_hms(9, 5, 7).to_string(), "09:05:07");
        assert_eq!(ServiceTime::from_hms(25, 0, 0).to_string(), "25:00:00");
        assert_eq!(ServiceTime::NEVER.to_string(), "--:--:--");
    }

    #[test]
    fn offset_clamps_at_midnight() {
        let t = ServiceTime::from_hms(0, 1, 0);
        assert_eq!(t.offset_by(-120), ServiceTime::from_secs(0));
        assert_eq!(t.offset_by(300), ServiceTime::from_hms(0, 6, 0));
    }

    #[test]
    fn plus_secs_saturates() {
        assert!(ServiceTime::NEVER.plus_secs(10).is_never());
        assert!(!ServiceTime::from_secs(10).plus_secs(10).is_never());
        assert_eq!(ServiceTime::from_secs(10).minus_secs(30).as_secs(), 0);
        assert_eq!(ServiceTime::from_secs(100).minus_secs(30).as_secs(), 70);
    }

    #[test]
    fn duration_arithmetic() {
        let dep = ServiceTime::from_hms(14, 17, 0);
        let arr = ServiceTime::from_hms(15, 8, 0);
        assert_eq!(arr - dep, Duration::minutes(51));
        assert_eq!(dep - arr, Duration::minutes(-51));
        assert_eq!(dep + Duration::minutes(34), ServiceTime::from_hms(14, 51, 0));
        assert_eq!(arr.secs_since(dep), 51 * 60);
    }

    #[test]
    fn wall_clock_wraps_past_midnight() {
        let t = ServiceTime::from_hms(25, 30, 0);
        assert_eq!(t.to_naive_time(), NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        assert_eq!(t.day_offset(), 1);
    }

    #[test]
    fn serde_uses_clock_strings() {
        let t = ServiceTime::from_hms(14, 54, 0);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"14:54:00\"");
        let back: ServiceTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<ServiceTime>("\"nope\"").is_err());
    }

    #[test]
    fn format_helpers() {
        assert_eq!(format_duration(Duration::minutes(45)), "45m");
        assert_eq!(format_duration(Duration::minutes(60)), "1h");
        assert_eq!(format_duration(Duration::minutes(65)), "1h 5m");

        assert_eq!(format_delay(0), "On time");
        assert_eq!(format_delay(30), "On time");
        assert_eq!(format_delay(300), "5 min delay");
        assert_eq!(format_delay(-120), "2 min early");
    }
}
