//! # Archive Timestamps
//!
//! Revision and release dates in the archive are recorded in the author's
//! local time. The web API renders them as RFC 3339 strings with the
//! original offset, e.g. `2013-07-06T19:34:11-04:00`.
//!
//! Unlike a canonical UTC timestamp, the offset here is data: two dates
//! naming the same instant from different time zones compare equal as
//! instants but render differently, and callers reconstructing commit
//! metadata need the original offset back.

use chrono::{DateTime, FixedOffset};

use crate::error::TimestampError;

/// A point in time with the UTC offset it was recorded in.
pub type ArchiveTimestamp = DateTime<FixedOffset>;

/// Parse an API date string, keeping its offset.
///
/// Accepts RFC 3339 with either `Z` or an explicit `±HH:MM` offset and an
/// optional fractional-seconds part.
///
/// # Errors
///
/// Returns [`TimestampError`] if the string is not valid RFC 3339.
pub fn parse_timestamp(s: &str) -> Result<ArchiveTimestamp, TimestampError> {
    DateTime::parse_from_rfc3339(s).map_err(|e| TimestampError {
        input: s.to_string(),
        reason: e.to_string(),
    })
}
