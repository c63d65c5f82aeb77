//! MusicBrainz HTTP client with request spacing

use async_trait::async_trait;
use encore_core::{ActRecord, EncoreError, EncoreResult};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::transform::to_act_record;
use super::types::{ArtistResponse, ErrorBody};
use crate::{
    default_user_agent, env_or, invalid_response, not_found, rate_limited, request_failed,
    ActMetadataGateway,
};

const PROVIDER: &str = "musicbrainz";

pub const DEFAULT_MUSICBRAINZ_URL: &str = "https://musicbrainz.org/ws/2";
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct MusicBrainzConfig {
    /// Web service root, without trailing slash.
    pub base_url: String,
    pub user_agent: String,
    /// Minimum gap between two requests (MusicBrainz allows about 1/s).
    pub min_request_interval: Duration,
    pub timeout: Duration,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MUSICBRAINZ_URL.to_string(),
            user_agent: default_user_agent(),
            min_request_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl MusicBrainzConfig {
    /// Create MusicBrainzConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ENCORE_MUSICBRAINZ_URL`: Web service root (default: https://musicbrainz.org/ws/2)
    /// - `ENCORE_USER_AGENT`: User-Agent header (default: encore/<version>)
    /// - `ENCORE_MUSICBRAINZ_MIN_INTERVAL_MS`: Request spacing (default: 1000)
    /// - `ENCORE_HTTP_TIMEOUT_SECS`: Request timeout (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_or("ENCORE_MUSICBRAINZ_URL", defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            user_agent: env_or("ENCORE_USER_AGENT", defaults.user_agent),
            min_request_interval: Duration::from_millis(env_or(
                "ENCORE_MUSICBRAINZ_MIN_INTERVAL_MS",
                DEFAULT_MIN_INTERVAL_MS,
            )),
            timeout: Duration::from_secs(env_or(
                "ENCORE_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// MusicBrainz artist lookup client.
pub struct MusicBrainzClient {
    client: Client,
    config: MusicBrainzConfig,
    /// Instant of the previous request, held across the spacing sleep so
    /// concurrent callers queue up behind each other.
    last_request: Mutex<Option<Instant>>,
}

impl MusicBrainzClient {
    pub fn new(config: MusicBrainzConfig) -> EncoreResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| request_failed(PROVIDER, 0, format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    pub fn artist_url(&self, id: &str) -> String {
        format!("{}/artist/{}?inc=url-rels&fmt=json", self.config.base_url, id)
    }

    async fn wait_for_slot(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.config.min_request_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Look up an artist and return the raw response.
    pub async fn lookup(&self, id: &str) -> EncoreResult<ArtistResponse> {
        self.wait_for_slot().await;

        let response = self
            .client
            .get(self.artist_url(id))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| invalid_response(PROVIDER, format!("Failed to parse response: {}", e)));
        }

        let retry_after_ms = parse_retry_after_ms(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, retry_after_ms, id, &body))
    }
}

/// Map a non-2xx response to an upstream error.
fn error_for_status(
    status: StatusCode,
    retry_after_ms: Option<u64>,
    id: &str,
    body: &str,
) -> EncoreError {
    match status {
        StatusCode::NOT_FOUND => not_found(PROVIDER, id),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            rate_limited(PROVIDER, retry_after_ms.unwrap_or(0))
        }
        _ => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .map(|b| b.error)
                .unwrap_or_else(|_| body.to_string());
            request_failed(PROVIDER, status.as_u16(), message)
        }
    }
}

fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| *seconds >= 0.0)
        .map(|seconds| (seconds * 1000.0) as u64)
}

#[async_trait]
impl ActMetadataGateway for MusicBrainzClient {
    async fn fetch_act(&self, id: &str) -> EncoreResult<ActRecord> {
        let artist = self.lookup(id).await?;
        Ok(to_act_record(artist))
    }
}

impl std::fmt::Debug for MusicBrainzClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicBrainzClient")
            .field("base_url", &self.config.base_url)
            .field("min_request_interval", &self.config.min_request_interval)
            .finish()
    }
}
