//! Status rule: derive an act's status from its upcoming events.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::entities::{ActStatus, Event};

/// Nearest event at most this many days out means the act is on tour.
pub const ON_TOUR_WINDOW_DAYS: i64 = 90;

/// Nearest event at most this many days out means a tour is planned.
pub const TOUR_PLANNED_WINDOW_DAYS: i64 = 270;

/// Derive the status from `events`, relative to today (UTC).
///
/// Past-dated events are ignored; see [`determine_status_on`].
pub fn determine_status(events: &[Event], fallback: ActStatus) -> ActStatus {
    determine_status_on(events, fallback, Utc::now().date_naive())
}

/// Derive the status from `events`, relative to `today`.
///
/// Past-dated events are filtered out: only events dated today or later
/// count towards the nearest date. Events whose date is
/// empty or unparseable are skipped without affecting the others. With no
/// usable event, or a nearest event beyond the planning window, `fallback`
/// is returned unchanged.
pub fn determine_status_on(events: &[Event], fallback: ActStatus, today: NaiveDate) -> ActStatus {
    let nearest = events
        .iter()
        .filter_map(|event| parse_event_date(&event.date))
        .map(|date| (date - today).num_days())
        .filter(|days| *days >= 0)
        .min();

    match nearest {
        Some(days) if days <= ON_TOUR_WINDOW_DAYS => ActStatus::OnTour,
        Some(days) if days <= TOUR_PLANNED_WINDOW_DAYS => ActStatus::TourPlanned,
        _ => fallback,
    }
}

/// Parse the calendar date of an event.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, and offset-less
/// `YYYY-MM-DDTHH:MM[:SS]` timestamps.
pub fn parse_event_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.date())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    fn event_in(days: i64) -> Event {
        Event {
            name: format!("Show in {days} days"),
            date: (today() + chrono::Duration::days(days))
                .format("%Y-%m-%d")
                .to_string(),
            ..Default::default()
        }
    }

    fn event_dated(date: &str) -> Event {
        Event {
            date: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_events_keeps_fallback() {
        assert_eq!(
            determine_status_on(&[], ActStatus::Disbanded, today()),
            ActStatus::Disbanded
        );
    }

    #[test]
    fn test_window_boundaries() {
        let cases = [
            (0, ActStatus::OnTour),
            (90, ActStatus::OnTour),
            (91, ActStatus::TourPlanned),
            (270, ActStatus::TourPlanned),
            (271, ActStatus::Active),
        ];
        for (days, expected) in cases {
            assert_eq!(
                determine_status_on(&[event_in(days)], ActStatus::Active, today()),
                expected,
                "{days} days out"
            );
        }
    }

    #[test]
    fn test_nearest_event_wins_regardless_of_order() {
        let events = vec![event_in(200), event_in(30), event_in(400)];
        assert_eq!(
            determine_status_on(&events, ActStatus::Active, today()),
            ActStatus::OnTour
        );
    }

    #[test]
    fn test_invalid_dates_are_ignored() {
        let events = vec![event_dated(""), event_dated("soon"), event_in(120)];
        assert_eq!(
            determine_status_on(&events, ActStatus::Active, today()),
            ActStatus::TourPlanned
        );

        let only_invalid = vec![event_dated(""), event_dated("31/12/2025")];
        assert_eq!(
            determine_status_on(&only_invalid, ActStatus::Active, today()),
            ActStatus::Active
        );
    }

    #[test]
    fn test_null_and_numeric_dates_are_ignored() {
        let events: Vec<Event> = serde_json::from_value(json!([
            { "name": "a", "date": null },
            { "name": "b", "date": 12345 },
            { "name": "c" },
        ]))
        .unwrap();
        assert_eq!(
            determine_status_on(&events, ActStatus::Disbanded, today()),
            ActStatus::Disbanded
        );
    }

    #[test]
    fn test_past_events_do_not_count() {
        let events = vec![event_in(-10)];
        assert_eq!(
            determine_status_on(&events, ActStatus::Active, today()),
            ActStatus::Active
        );
    }

    #[test]
    fn test_parse_event_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 14);
        assert_eq!(parse_event_date("2025-06-14"), expected);
        assert_eq!(parse_event_date("2025-06-14T20:00:00"), expected);
        assert_eq!(parse_event_date("2025-06-14T20:00"), expected);
        assert_eq!(parse_event_date("2025-06-14T20:00:00+02:00"), expected);
        assert_eq!(parse_event_date("14.06.2025"), None);
        assert_eq!(parse_event_date("   "), None);
    }

    fn any_status() -> impl Strategy<Value = ActStatus> {
        prop_oneof![
            Just(ActStatus::Active),
            Just(ActStatus::Disbanded),
            Just(ActStatus::OnTour),
            Just(ActStatus::TourPlanned),
            Just(ActStatus::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn prop_empty_events_return_fallback(fallback in any_status()) {
            prop_assert_eq!(determine_status_on(&[], fallback, today()), fallback);
        }

        #[test]
        fn prop_garbage_dates_never_change_result(
            days in 0i64..400,
            junk in proptest::collection::vec("[a-z ]{0,12}", 0..5),
            fallback in any_status(),
        ) {
            let clean = vec![event_in(days)];
            let mut noisy: Vec<Event> = junk.iter().map(|j| event_dated(j)).collect();
            noisy.push(event_in(days));

            prop_assert_eq!(
                determine_status_on(&clean, fallback, today()),
                determine_status_on(&noisy, fallback, today())
            );
        }
    }
}
