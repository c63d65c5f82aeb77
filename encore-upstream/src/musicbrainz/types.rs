//! MusicBrainz web service response types

use serde::Deserialize;

// ============================================================================
// ARTIST LOOKUP
// ============================================================================

/// Body of `GET /artist/{mbid}?inc=url-rels&fmt=json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub disambiguation: Option<String>,
    #[serde(default)]
    pub area: Option<Area>,
    #[serde(default, rename = "life-span")]
    pub life_span: Option<LifeSpan>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Area {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifeSpan {
    #[serde(default)]
    pub ended: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relation {
    #[serde(default, rename = "type")]
    pub relation_type: Option<String>,
    #[serde(default)]
    pub url: Option<UrlResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlResource {
    pub resource: String,
}

/// Error body returned alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
