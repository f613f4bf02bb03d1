//! # Local-Time Handling
//!
//! KITS timestamps are wall-clock US/Central with no zone marker, and the
//! downstream portal stores zone-naive strings. Everything here attaches the
//! fixed zone, validates the wall time actually exists, and renders the
//! portal's `YYYY-MM-DDTHH:mm:ss` format.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use chrono_tz::US::Central;

use crate::error::KitsError;

/// The traffic-management system's local zone.
pub const KITS_TZ: Tz = Central;

/// Zone-naive portal timestamp format.
const PORTAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parses a timestamp string as the database's text output renders it.
/// Accepts both space- and `T`-separated forms, with or without fractional
/// seconds.
pub fn parse_db_timestamp(value: &str) -> Result<NaiveDateTime, KitsError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    Err(KitsError::BadTimestamp(value.to_string()))
}

/// Drops a trailing zone suffix (`Z` or `±HH:MM`) from a catalog timestamp
/// so the remainder parses as a wall time.
pub fn trim_zone_suffix(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    // offsets look like "+00:00"/"-06:00"; anything shorter is date content
    if value.len() > 6 && value.is_char_boundary(value.len() - 6) {
        let tail = &value[value.len() - 6..];
        if (tail.starts_with('+') || tail.starts_with('-')) && tail[1..].contains(':') {
            return &value[..value.len() - 6];
        }
    }
    value
}

/// Interprets `naive` as a US/Central wall time and renders the zone-naive
/// portal string. A wall time skipped by a DST transition is an error;
/// an ambiguous one resolves to the earlier instant.
pub fn to_portal_string(naive: NaiveDateTime) -> Result<String, KitsError> {
    let local = match KITS_TZ.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => {
            return Err(KitsError::BadTimestamp(format!(
                "{} does not exist in {}",
                naive, KITS_TZ
            )));
        }
    };
    Ok(local.format(PORTAL_FORMAT).to_string())
}

/// Current wall-clock time in the KITS zone, rendered for the portal. Taken
/// once per run and passed into the pipeline stages.
pub fn run_stamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&KITS_TZ).format(PORTAL_FORMAT).to_string()
}
