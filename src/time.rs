//! # Time input normalization
//!
//! Callers may hand the library either raw UTC strings (already in the
//! `%Y-%m-%d %H:%M:%S` format the ephemeris service understands) or structured
//! [`hifitime::Epoch`] values. Both are represented by the [`Time`] tagged union and
//! normalized to a canonical UTC string at the library boundary, before any epoch
//! enters the geometry engine.

use hifitime::Epoch;

/// A point in time accepted at the library boundary.
///
/// * `Utc` – a UTC date-time string in a format the ephemeris service accepts,
///   typically `%Y-%m-%d %H:%M:%S`. Passed through unchanged.
/// * `Calendar` – a structured [`hifitime::Epoch`]; formatted into the canonical
///   UTC string on normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Time {
    Utc(String),
    Calendar(Epoch),
}

impl Time {
    /// Normalize into the canonical UTC string (`%Y-%m-%d %H:%M:%S`).
    ///
    /// Return
    /// ----------
    /// * The canonical string representation handed to the ephemeris service.
    pub fn to_utc_string(&self) -> String {
        match self {
            Time::Utc(s) => s.clone(),
            Time::Calendar(epoch) => {
                let (year, month, day, hour, minute, second, _nanos) = epoch.to_gregorian_utc();
                format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
            }
        }
    }
}

impl From<&str> for Time {
    fn from(s: &str) -> Self {
        Time::Utc(s.to_string())
    }
}

impl From<String> for Time {
    fn from(s: String) -> Self {
        Time::Utc(s)
    }
}

impl From<Epoch> for Time {
    fn from(epoch: Epoch) -> Self {
        Time::Calendar(epoch)
    }
}

/// Normalize a batch of time inputs into canonical UTC strings, preserving order.
pub fn normalize_times(times: &[Time]) -> Vec<String> {
    times.iter().map(Time::to_utc_string).collect()
}
