//! Act and event records as they are cached.
//!
//! Field names on the wire are camelCase (`updatedAt`, `localTime`) because
//! the records are served verbatim to API clients.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Upstream identifier of an act (a MusicBrainz artist MBID).
pub type ActId = String;

/// Relation key under which the tour-listing page of an act is stored.
pub const TOUR_LISTING_RELATION: &str = "bandsintown";

// ============================================================================
// STATUS
// ============================================================================

/// Lifecycle status of an act.
///
/// `Active` and `Disbanded` come from upstream metadata. `OnTour` and
/// `TourPlanned` are derived from upcoming events and override the former.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "disbanded")]
    Disbanded,
    #[serde(rename = "on tour")]
    OnTour,
    #[serde(rename = "tour planned")]
    TourPlanned,
    /// Value written by an older schema we no longer recognise.
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl ActStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disbanded => "disbanded",
            Self::OnTour => "on tour",
            Self::TourPlanned => "tour planned",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ActStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Coordinates of an event venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Where an event takes place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(default)]
    pub geo: Geo,
}

/// A single tour date. Always rebuilt from source on refresh.
///
/// `date` is `YYYY-MM-DD`, or empty when the source date could not be parsed.
/// Records written by older code may carry `null` or numbers in the string
/// fields; those deserialize to empty strings so they never break a read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub local_time: String,
    #[serde(default)]
    pub location: Location,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

// ============================================================================
// ACT RECORD
// ============================================================================

/// The cached unit: upstream metadata enriched with tour events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActRecord {
    pub id: ActId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub disambiguation: Option<String>,
    pub status: ActStatus,
    /// Platform name to URL.
    #[serde(default)]
    pub relations: BTreeMap<String, String>,
    /// Source order, not date order.
    #[serde(default)]
    pub events: Vec<Event>,
    /// Berlin local time, `YYYY-MM-DD HH:MM:SS`. Only used for staleness.
    ///
    /// Non-string values from older writers read as `None`, i.e. stale.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,
}

impl ActRecord {
    /// Create a bare record with no relations, events or timestamp.
    pub fn new(id: impl Into<ActId>, name: impl Into<String>, status: ActStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            country: None,
            region: None,
            disambiguation: None,
            status,
            relations: BTreeMap::new(),
            events: Vec::new(),
            updated_at: None,
        }
    }

    /// URL of the tour-listing page, if the act has one.
    pub fn tour_listing_url(&self) -> Option<&str> {
        self.relations
            .get(TOUR_LISTING_RELATION)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn stamp(&self) -> ActStamp {
        ActStamp {
            id: self.id.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Id and timestamp projection used by the bootstrap pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActStamp {
    pub id: ActId,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<String>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(ActStatus::OnTour).unwrap(), json!("on tour"));
        assert_eq!(
            serde_json::to_value(ActStatus::TourPlanned).unwrap(),
            json!("tour planned")
        );
        let parsed: ActStatus = serde_json::from_value(json!("disbanded")).unwrap();
        assert_eq!(parsed, ActStatus::Disbanded);
    }

    #[test]
    fn test_unrecognised_status_reads_as_unknown() {
        let parsed: ActStatus = serde_json::from_value(json!("hiatus")).unwrap();
        assert_eq!(parsed, ActStatus::Unknown);
    }

    #[test]
    fn test_event_tolerates_null_and_numeric_fields() {
        let event: Event = serde_json::from_value(json!({
            "name": null,
            "date": 20250101,
            "localTime": "20:00",
            "location": { "address": "Berlin", "geo": { "lat": 52.5, "lon": 13.4 } }
        }))
        .unwrap();

        assert_eq!(event.name, "");
        assert_eq!(event.date, "");
        assert_eq!(event.local_time, "20:00");
        assert_eq!(event.location.geo.lat, Some(52.5));
    }

    #[test]
    fn test_record_uses_camel_case_timestamp() {
        let mut record = ActRecord::new("abc", "Some Band", ActStatus::Active);
        record.updated_at = Some("2025-01-01 12:00:00".to_string());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["updatedAt"], json!("2025-01-01 12:00:00"));
        assert_eq!(value["status"], json!("active"));
        assert!(value["events"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_non_string_timestamp_reads_as_missing() {
        let record: ActRecord = serde_json::from_value(json!({
            "id": "legacy",
            "name": "L",
            "status": "active",
            "updatedAt": 1700000000
        }))
        .unwrap();
        assert_eq!(record.updated_at, None);

        let stamp: ActStamp = serde_json::from_value(json!({
            "id": "legacy",
            "updatedAt": null
        }))
        .unwrap();
        assert_eq!(stamp.updated_at, None);
    }

    #[test]
    fn test_tour_listing_url_ignores_empty_relation() {
        let mut record = ActRecord::new("abc", "Some Band", ActStatus::Active);
        assert_eq!(record.tour_listing_url(), None);

        record
            .relations
            .insert(TOUR_LISTING_RELATION.to_string(), String::new());
        assert_eq!(record.tour_listing_url(), None);

        record.relations.insert(
            TOUR_LISTING_RELATION.to_string(),
            "https://www.bandsintown.com/a/1".to_string(),
        );
        assert_eq!(
            record.tour_listing_url(),
            Some("https://www.bandsintown.com/a/1")
        );
    }
}
