//! Encore Upstream - Metadata and Tour Event Gateways
//!
//! Gateway traits the enrichment pipeline depends on, with one HTTP
//! implementation per upstream:
//!
//! - [`MusicBrainzClient`]: act metadata from the MusicBrainz web service
//! - [`BandsintownClient`]: tour events scraped from LD+JSON on listing pages
//!
//! Each gateway returns records already transformed into the cached shape.

use async_trait::async_trait;
use encore_core::{ActRecord, EncoreError, EncoreResult, Event, UpstreamError};

pub mod bandsintown;
pub mod musicbrainz;

pub use bandsintown::{BandsintownClient, BandsintownConfig};
pub use musicbrainz::{MusicBrainzClient, MusicBrainzConfig};

// ============================================================================
// GATEWAY TRAITS
// ============================================================================

/// Source of act metadata.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ActMetadataGateway: Send + Sync {
    /// Fetch one act and transform it into a record.
    ///
    /// The returned record has no events and no `updatedAt`; `status` is
    /// `active` or `disbanded`.
    async fn fetch_act(&self, id: &str) -> EncoreResult<ActRecord>;
}

/// Source of tour events for an act's tour-listing page.
#[async_trait]
pub trait EventGateway: Send + Sync {
    /// Fetch and extract events from `url`, in page order.
    async fn fetch_events(&self, url: &str) -> EncoreResult<Vec<Event>>;
}

// ============================================================================
// ERROR HELPERS
// ============================================================================

pub(crate) fn request_failed(
    provider: &str,
    status: u16,
    message: impl Into<String>,
) -> EncoreError {
    UpstreamError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    }
    .into()
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: u64) -> EncoreError {
    UpstreamError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    }
    .into()
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> EncoreError {
    UpstreamError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
    .into()
}

pub(crate) fn not_found(provider: &str, id: &str) -> EncoreError {
    UpstreamError::NotFound {
        provider: provider.to_string(),
        id: id.to_string(),
    }
    .into()
}

/// Default User-Agent. MusicBrainz rejects anonymous clients.
pub fn default_user_agent() -> String {
    format!(
        "encore/{} ( https://encore.live/contact )",
        env!("CARGO_PKG_VERSION")
    )
}

/// Read an environment variable, falling back to `default` when it is
/// missing or fails to parse.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring malformed environment value");
                default
            }
        },
        Err(_) => default,
    }
}
