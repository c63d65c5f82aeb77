//! Berlin-local timestamps for `updatedAt`.
//!
//! Records are stamped in Europe/Berlin wall-clock time without an offset,
//! so parsing has to resolve the zone again. Ambiguous wall-clock times
//! (the repeated hour when DST ends) resolve to the earlier instant; times
//! that do not exist (the skipped hour when DST starts) do not parse.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::Berlin;

/// Format of `ActRecord::updated_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current Berlin-local timestamp.
pub fn berlin_timestamp() -> String {
    berlin_timestamp_at(Utc::now())
}

/// Berlin-local timestamp for a given instant.
pub fn berlin_timestamp_at(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Berlin)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Parse a Berlin-local timestamp back into UTC.
pub fn parse_berlin_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()?;
    Berlin
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
