//! Bandsintown listing page client

use async_trait::async_trait;
use encore_core::{EncoreResult, Event};
use reqwest::Client;
use std::time::Duration;

use super::extract::{extract_event_nodes, extract_ld_json};
use super::transform::to_event;
use crate::musicbrainz::client::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::{default_user_agent, env_or, request_failed, EventGateway};

const PROVIDER: &str = "bandsintown";

#[derive(Debug, Clone)]
pub struct BandsintownConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for BandsintownConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl BandsintownConfig {
    /// Create BandsintownConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ENCORE_USER_AGENT`: User-Agent header (default: encore/<version>)
    /// - `ENCORE_HTTP_TIMEOUT_SECS`: Request timeout (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            user_agent: env_or("ENCORE_USER_AGENT", defaults.user_agent),
            timeout: Duration::from_secs(env_or(
                "ENCORE_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
        }
    }
}

/// Tour-listing scraper.
///
/// Fails closed: network errors, error statuses and pages without usable
/// LD+JSON all yield an empty event list.
#[derive(Debug)]
pub struct BandsintownClient {
    client: Client,
}

impl BandsintownClient {
    pub fn new(config: BandsintownConfig) -> EncoreResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| request_failed(PROVIDER, 0, format!("Failed to build client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html")
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("unexpected status {}", status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("Failed to read body: {}", e))
    }
}

/// Events contained in a listing page, in document order.
pub fn events_from_html(html: &str) -> Vec<Event> {
    extract_event_nodes(extract_ld_json(html))
        .iter()
        .map(to_event)
        .collect()
}

#[async_trait]
impl EventGateway for BandsintownClient {
    async fn fetch_events(&self, url: &str) -> EncoreResult<Vec<Event>> {
        match self.fetch_page(url).await {
            Ok(html) => {
                let events = events_from_html(&html);
                tracing::debug!(url, count = events.len(), "Extracted tour events");
                Ok(events)
            }
            Err(reason) => {
                tracing::warn!(url, error = %reason, "Tour listing fetch failed, using no events");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_from_listing_page() {
        let html = r#"
            <script type="application/ld+json">
            [
              {
                "@type": "MusicEvent",
                "name": "Night One",
                "startDate": "2025-03-01T19:00:00",
                "location": {
                  "name": "Arena",
                  "address": { "addressLocality": "Hamburg", "addressCountry": "DE" },
                  "geo": { "latitude": 53.55, "longitude": 9.99 }
                }
              },
              { "@type": "BreadcrumbList" },
              { "@type": "MusicEvent", "name": "Night Two", "startDate": "2025-03-02" }
            ]
            </script>
        "#;

        let events = events_from_html(html);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Night One");
        assert_eq!(events[0].local_time, "19:00");
        assert_eq!(events[0].location.address, "Hamburg, DE");
        assert_eq!(events[1].date, "2025-03-02");
        assert_eq!(events[1].local_time, "");
    }

    #[tokio::test]
    async fn test_unreachable_listing_fails_closed() {
        let client = BandsintownClient::new(BandsintownConfig {
            timeout: Duration::from_millis(500),
            ..BandsintownConfig::default()
        })
        .unwrap();

        let events = client
            .fetch_events("http://127.0.0.1:9/listing")
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
