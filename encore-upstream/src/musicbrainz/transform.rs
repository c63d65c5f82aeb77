//! MusicBrainz artist to act record

use encore_core::{ActRecord, ActStatus, TOUR_LISTING_RELATION};
use reqwest::Url;

use super::types::ArtistResponse;

/// Host suffix to relation key. First match wins.
const HOST_KEYS: &[(&str, &str)] = &[
    ("bandsintown.com", TOUR_LISTING_RELATION),
    ("spotify.com", "spotify"),
    ("youtube.com", "youtube"),
    ("youtu.be", "youtube"),
    ("instagram.com", "instagram"),
    ("facebook.com", "facebook"),
    ("soundcloud.com", "soundcloud"),
    ("bandcamp.com", "bandcamp"),
    ("wikidata.org", "wikidata"),
    ("discogs.com", "discogs"),
];

/// Map one URL relation to the platform key it is stored under.
pub fn relation_key(relation_type: Option<&str>, url: &str) -> Option<&'static str> {
    if relation_type == Some("official homepage") {
        return Some("homepage");
    }

    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    HOST_KEYS
        .iter()
        .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{suffix}")))
        .map(|(_, key)| *key)
}

/// Build an act record from an artist lookup.
///
/// Events and `updatedAt` are left empty for the enrichment pipeline.
pub fn to_act_record(artist: ArtistResponse) -> ActRecord {
    let ended = artist
        .life_span
        .as_ref()
        .and_then(|span| span.ended)
        .unwrap_or(false);
    let status = if ended {
        ActStatus::Disbanded
    } else {
        ActStatus::Active
    };

    let mut record = ActRecord::new(artist.id, artist.name, status);
    record.country = artist.country.filter(|c| !c.is_empty());
    record.region = artist
        .area
        .and_then(|area| area.name)
        .filter(|name| !name.is_empty());
    record.disambiguation = artist.disambiguation.filter(|d| !d.is_empty());

    for relation in artist.relations {
        let Some(url) = relation.url else { continue };
        if let Some(key) = relation_key(relation.relation_type.as_deref(), &url.resource) {
            record
                .relations
                .entry(key.to_string())
                .or_insert(url.resource);
        }
    }

    record
}
