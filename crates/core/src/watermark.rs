//! Watermark cursor: the last point in time the catalog was checked
//!
//! The canonical textual encoding is RFC 3339 in UTC with microsecond
//! precision (`2024-05-01T12:00:00.000000Z`). Values are truncated to
//! microseconds when stored so that encoding and parsing are lossless and
//! lexicographic order matches chronological order.

use crate::error::WatermarkError;
use chrono::{DateTime, Duration, DurationRound, SecondsFormat, Utc};
use std::fmt;

/// Smallest step a watermark advances by
fn tick() -> Duration {
    Duration::microseconds(1)
}

/// Cursor marking the last successfully checked point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(Option<DateTime<Utc>>);

impl Watermark {
    /// A watermark that has never been initialized
    pub const fn unset() -> Self {
        Self(None)
    }

    /// A watermark positioned at `ts`
    pub fn at(ts: DateTime<Utc>) -> Self {
        Self(Some(truncate(ts)))
    }

    /// Parse a watermark from its canonical encoding
    ///
    /// Any RFC 3339 offset is accepted and normalized to UTC.
    pub fn parse(input: &str) -> Result<Self, WatermarkError> {
        parse_timestamp(input).map(Self::at)
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Overwrite the cursor
    pub fn set(&mut self, ts: DateTime<Utc>) {
        self.0 = Some(truncate(ts));
    }

    /// Position the cursor at `now` if it has never been set
    ///
    /// Returns `true` if the watermark was initialized by this call.
    pub fn initialize(&mut self, now: DateTime<Utc>) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(truncate(now));
        true
    }

    /// Advance the cursor to `now`
    ///
    /// The new value is always strictly greater than the previous one: if
    /// the clock has not moved past the current cursor, the cursor moves
    /// forward by one microsecond instead. At the maximum representable
    /// time the cursor saturates.
    pub fn advance(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = truncate(now);
        let next = match self.0 {
            Some(prev) if now <= prev => prev.checked_add_signed(tick()).unwrap_or(prev),
            _ => now,
        };
        self.0 = Some(next);
        next
    }

    /// Canonical encoding, or `None` if unset
    pub fn encode(&self) -> Option<String> {
        self.0.map(format_timestamp)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ts) => f.write_str(&format_timestamp(ts)),
            None => f.write_str("<unset>"),
        }
    }
}

/// Encode a timestamp in the canonical watermark format
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a timestamp from RFC 3339 text
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, WatermarkError> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| WatermarkError::Parse {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(tick()).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_564_800 + secs, 0).unwrap()
    }

    #[test]
    fn test_initialize_only_when_unset() {
        let mut wm = Watermark::unset();
        assert!(wm.initialize(ts(0)));
        assert!(!wm.initialize(ts(60)));
        assert_eq!(wm.get(), Some(ts(0)));
    }

    #[test]
    fn test_advance_is_strictly_increasing() {
        let mut wm = Watermark::at(ts(10));

        // Clock behind the cursor still moves it forward
        let next = wm.advance(ts(5));
        assert!(next > ts(10));

        let again = wm.advance(next);
        assert!(again > next);

        assert_eq!(wm.advance(ts(20)), ts(20));
    }

    #[test]
    fn test_advance_saturates_at_max_time() {
        let mut wm = Watermark::at(DateTime::<Utc>::MAX_UTC);
        let max = wm.get().unwrap();

        assert_eq!(wm.advance(ts(0)), max);
        assert_eq!(wm.get(), Some(max));
    }

    #[test]
    fn test_canonical_encoding() {
        let wm = Watermark::at(ts(0));
        assert_eq!(wm.encode().unwrap(), "2024-05-01T12:00:00.000000Z");
        assert_eq!(Watermark::unset().encode(), None);
    }

    #[test]
    fn test_parse_normalizes_offset() {
        let wm = Watermark::parse("2024-05-01T14:00:00+02:00").unwrap();
        assert_eq!(wm.get(), Some(ts(0)));
    }

    #[test]
    fn test_encoding_sorts_chronologically() {
        let earlier = Watermark::at(ts(0)).encode().unwrap();
        let later = Watermark::at(ts(0) + Duration::microseconds(1500))
            .encode()
            .unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Watermark::parse("yesterday").unwrap_err();
        assert!(matches!(err, WatermarkError::Parse { .. }));
    }
}
