//! schema.org event node to cached event

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use encore_core::{Event, Geo, Location};
use serde_json::Value;

/// Address fields joined, in this order, into a single line.
const ADDRESS_PARTS: &[&str] = &[
    "streetAddress",
    "postalCode",
    "addressLocality",
    "addressRegion",
    "addressCountry",
];

/// Map one LD+JSON event node to an [`Event`].
///
/// Missing or malformed fields become empty strings or `None` coordinates;
/// this never fails.
pub fn to_event(node: &Value) -> Event {
    let (date, local_time) = node
        .get("startDate")
        .and_then(Value::as_str)
        .map(split_start_date)
        .unwrap_or_default();

    let place = match node.get("location") {
        Some(Value::Array(places)) => places.first(),
        other => other,
    };

    Event {
        name: text(node.get("name")),
        date,
        local_time,
        location: place.map(to_location).unwrap_or_default(),
    }
}

/// `startDate` to (`YYYY-MM-DD`, `HH:MM`). Either half is empty when absent
/// or unparseable.
fn split_start_date(raw: &str) -> (String, String) {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        // Local wall-clock time of the venue, as published.
        let local = dt.naive_local();
        return (
            local.format("%Y-%m-%d").to_string(),
            local.format("%H:%M").to_string(),
        );
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(local) = NaiveDateTime::parse_from_str(raw, format) {
            return (
                local.format("%Y-%m-%d").to_string(),
                local.format("%H:%M").to_string(),
            );
        }
    }

    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => (date.format("%Y-%m-%d").to_string(), String::new()),
        Err(_) => (String::new(), String::new()),
    }
}

fn to_location(place: &Value) -> Location {
    let address = match place.get("address") {
        Some(Value::String(line)) => line.trim().to_string(),
        Some(postal @ Value::Object(_)) => join_postal_address(postal),
        _ => String::new(),
    };
    let address = if address.is_empty() {
        text(place.get("name"))
    } else {
        address
    };

    let geo = place
        .get("geo")
        .map(|geo| Geo {
            lat: coordinate(geo.get("latitude")),
            lon: coordinate(geo.get("longitude")),
        })
        .unwrap_or_default();

    Location { address, geo }
}

fn join_postal_address(postal: &Value) -> String {
    ADDRESS_PARTS
        .iter()
        .filter_map(|key| match postal.get(*key) {
            Some(Value::String(s)) => Some(s.trim().to_string()),
            // addressCountry may be a Country node.
            Some(Value::Object(node)) => node
                .get("name")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_event() {
        let event = to_event(&json!({
            "@type": "MusicEvent",
            "name": "The Act @ Columbiahalle",
            "startDate": "2025-06-14T20:00:00",
            "location": {
                "@type": "Place",
                "name": "Columbiahalle",
                "address": {
                    "@type": "PostalAddress",
                    "streetAddress": "Columbiadamm 13-21",
                    "postalCode": "10965",
                    "addressLocality": "Berlin",
                    "addressCountry": { "@type": "Country", "name": "Germany" }
                },
                "geo": { "latitude": 52.4839, "longitude": "13.3925" }
            }
        }));

        assert_eq!(event.name, "The Act @ Columbiahalle");
        assert_eq!(event.date, "2025-06-14");
        assert_eq!(event.local_time, "20:00");
        assert_eq!(
            event.location.address,
            "Columbiadamm 13-21, 10965, Berlin, Germany"
        );
        assert_eq!(event.location.geo.lat, Some(52.4839));
        assert_eq!(event.location.geo.lon, Some(13.3925));
    }

    #[test]
    fn test_offset_datetime_keeps_local_time() {
        let (date, time) = split_start_date("2025-11-02T19:30:00-05:00");
        assert_eq!(date, "2025-11-02");
        assert_eq!(time, "19:30");
    }

    #[test]
    fn test_date_only_and_garbage() {
        assert_eq!(
            split_start_date("2025-01-05"),
            ("2025-01-05".to_string(), String::new())
        );
        assert_eq!(split_start_date("next friday"), (String::new(), String::new()));
    }

    #[test]
    fn test_venue_name_fallback_and_missing_geo() {
        let event = to_event(&json!({
            "@type": "Event",
            "name": "Club Show",
            "location": [{ "name": "Small Club" }]
        }));
        assert_eq!(event.date, "");
        assert_eq!(event.location.address, "Small Club");
        assert_eq!(event.location.geo, Geo::default());
    }

    #[test]
    fn test_bad_coordinates_are_dropped() {
        let event = to_event(&json!({
            "location": { "address": "Somewhere 1", "geo": { "latitude": "north", "longitude": null } }
        }));
        assert_eq!(event.name, "");
        assert_eq!(event.location.address, "Somewhere 1");
        assert_eq!(event.location.geo.lat, None);
        assert_eq!(event.location.geo.lon, None);
    }
}
