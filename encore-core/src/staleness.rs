//! Staleness predicate for cached acts.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::time::parse_berlin_timestamp;

/// Age at which a cached record is due for refresh (24 hours, inclusive).
pub const STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Whether a record stamped `updated_at` is stale now.
pub fn is_stale(updated_at: Option<&str>) -> bool {
    is_stale_at(updated_at, Utc::now())
}

/// Whether a record stamped `updated_at` is stale at `now`.
///
/// Missing or unparseable timestamps count as stale. A timestamp in the
/// future is fresh.
pub fn is_stale_at(updated_at: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(updated) = updated_at.and_then(parse_berlin_timestamp) else {
        return true;
    };
    match (now - updated).to_std() {
        Ok(age) => age >= STALE_AFTER,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::berlin_timestamp_at;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn hours_ago(hours: i64) -> String {
        berlin_timestamp_at(now() - chrono::Duration::hours(hours))
    }

    #[test]
    fn test_twelve_hours_is_fresh() {
        assert!(!is_stale_at(Some(&hours_ago(12)), now()));
    }

    #[test]
    fn test_exactly_24_hours_is_stale() {
        assert!(is_stale_at(Some(&hours_ago(24)), now()));
    }

    #[test]
    fn test_25_hours_is_stale() {
        assert!(is_stale_at(Some(&hours_ago(25)), now()));
    }

    #[test]
    fn test_missing_or_garbled_timestamp_is_stale() {
        assert!(is_stale_at(None, now()));
        assert!(is_stale_at(Some(""), now()));
        assert!(is_stale_at(Some("not a date"), now()));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let ahead = berlin_timestamp_at(now() + chrono::Duration::hours(3));
        assert!(!is_stale_at(Some(&ahead), now()));
    }

    proptest! {
        #[test]
        fn prop_staleness_threshold(minutes in 0i64..(72 * 60)) {
            let stamp = berlin_timestamp_at(now() - chrono::Duration::minutes(minutes));
            prop_assert_eq!(is_stale_at(Some(&stamp), now()), minutes >= 24 * 60);
        }
    }
}
