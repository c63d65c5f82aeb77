//! Enrichment pipeline
//!
//! One metadata fetch, one conditional event fetch, the status rule and a
//! Berlin timestamp. Nothing here touches the cache.

use encore_core::{berlin_timestamp, determine_status, ActRecord, EncoreResult};
use encore_upstream::{ActMetadataGateway, EventGateway};
use std::sync::Arc;

/// What to do when the tour-listing fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFailure {
    /// Fail the whole enrichment. Used on client-facing paths.
    Propagate,
    /// Continue with no events. Used by background refreshes.
    Silent,
}

/// Builds fresh act records from the upstream gateways.
#[derive(Clone)]
pub struct Enricher {
    metadata: Arc<dyn ActMetadataGateway>,
    events: Arc<dyn EventGateway>,
}

impl Enricher {
    pub fn new(metadata: Arc<dyn ActMetadataGateway>, events: Arc<dyn EventGateway>) -> Self {
        Self { metadata, events }
    }

    /// Fetch and assemble a record for `id`.
    ///
    /// Metadata errors always propagate. Event errors propagate or are
    /// swallowed according to `on_event_failure`.
    pub async fn enrich(&self, id: &str, on_event_failure: EventFailure) -> EncoreResult<ActRecord> {
        let mut record = self.metadata.fetch_act(id).await?;

        let events = match record.tour_listing_url() {
            Some(url) => match self.events.fetch_events(url).await {
                Ok(events) => events,
                Err(e) if on_event_failure == EventFailure::Silent => {
                    tracing::warn!(
                        act_id = %id,
                        url,
                        error = %e,
                        "Event fetch failed, continuing without events"
                    );
                    Vec::new()
                }
                Err(e) => return Err(e),
            },
            None => Vec::new(),
        };

        record.status = determine_status(&events, record.status);
        record.events = events;
        record.updated_at = Some(berlin_timestamp());
        Ok(record)
    }
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher").finish_non_exhaustive()
    }
}
