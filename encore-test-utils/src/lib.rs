//! Encore Test Utilities
//!
//! Shared test infrastructure for the Encore workspace:
//! - A scripted cache store with switchable failures and call counters
//! - Mock upstream gateways
//! - Fixtures for acts, events and Berlin timestamps
//! - Proptest generators

pub use encore_core::{
    ActRecord, ActStamp, ActStatus, EncoreError, EncoreResult, Event, Geo, Location,
    StorageError, UpstreamError, TOUR_LISTING_RELATION,
};
pub use encore_storage::{ActStore, InMemoryActStore, HEALTH_SENTINEL_ID};
pub use encore_upstream::{ActMetadataGateway, EventGateway};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

// ============================================================================
// SCRIPTED STORE
// ============================================================================

/// In-memory store whose failures and latency can be switched at runtime.
///
/// Counters include calls that were made to fail.
#[derive(Debug)]
pub struct ScriptedStore {
    inner: InMemoryActStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_probe: AtomicBool,
    fail_list: AtomicBool,
    read_delay: Mutex<Option<Duration>>,
    write_delay: Mutex<Option<Duration>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    probes: AtomicUsize,
    written: Mutex<Vec<String>>,
    settled_writes: watch::Sender<usize>,
}

impl Default for ScriptedStore {
    fn default() -> Self {
        Self::with_records(Vec::new())
    }
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ActRecord>) -> Self {
        let (settled_writes, _) = watch::channel(0);
        Self {
            inner: InMemoryActStore::with_records(records),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_probe: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            read_delay: Mutex::new(None),
            write_delay: Mutex::new(None),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
            settled_writes,
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock().unwrap() = delay;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Upsert calls, sentinel writes excluded.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Ids successfully written, in write order.
    pub fn written_ids(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    /// Current contents, bypassing failure switches and counters.
    pub async fn snapshot(&self, id: &str) -> Option<ActRecord> {
        self.inner.get(id).await.ok().flatten()
    }

    /// Wait until at least `count` upserts have settled (succeeded or failed).
    pub async fn wait_for_writes(&self, count: usize) {
        let mut rx = self.settled_writes.subscribe();
        let _ = rx.wait_for(|settled| *settled >= count).await;
    }

    fn delay(slot: &Mutex<Option<Duration>>) -> Option<Duration> {
        *slot.lock().unwrap()
    }

    fn list_error(&self) -> EncoreResult<()> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StorageError::ListFailed {
                reason: "scripted list failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl ActStore for ScriptedStore {
    async fn get(&self, id: &str) -> EncoreResult<Option<ActRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = Self::delay(&self.read_delay) {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed {
                id: id.to_string(),
                reason: "scripted read failure".to_string(),
            }
            .into());
        }
        self.inner.get(id).await
    }

    async fn upsert(&self, record: &ActRecord) -> EncoreResult<()> {
        let is_sentinel = record.id == HEALTH_SENTINEL_ID;
        if !is_sentinel {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(delay) = Self::delay(&self.write_delay) {
            tokio::time::sleep(delay).await;
        }

        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::WriteFailed {
                id: record.id.clone(),
                reason: "scripted write failure".to_string(),
            }
            .into())
        } else {
            self.inner.upsert(record).await
        };

        if !is_sentinel {
            if result.is_ok() {
                self.written.lock().unwrap().push(record.id.clone());
            }
            self.settled_writes.send_modify(|settled| *settled += 1);
        }
        result
    }

    async fn delete(&self, id: &str) -> EncoreResult<()> {
        self.inner.delete(id).await
    }

    async fn list_ids(&self) -> EncoreResult<Vec<String>> {
        self.list_error()?;
        self.inner.list_ids().await
    }

    async fn list_stamps(&self) -> EncoreResult<Vec<ActStamp>> {
        self.list_error()?;
        self.inner.list_stamps().await
    }

    async fn list_ids_without_tour_listing(&self) -> EncoreResult<Vec<String>> {
        self.list_error()?;
        self.inner.list_ids_without_tour_listing().await
    }

    async fn probe_health(&self) -> EncoreResult<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed {
                id: HEALTH_SENTINEL_ID.to_string(),
                reason: "scripted probe failure".to_string(),
            }
            .into());
        }
        self.inner.probe_health().await
    }
}

// ============================================================================
// MOCK GATEWAYS
// ============================================================================

/// Metadata gateway answering from a script.
///
/// Unscripted ids resolve to [`fixtures::act_fixture`].
#[derive(Debug, Default)]
pub struct MockMetadataGateway {
    responses: Mutex<HashMap<String, EncoreResult<ActRecord>>>,
    calls: Mutex<Vec<String>>,
}

impl MockMetadataGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_act(self, record: ActRecord) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(record.id.clone(), Ok(record));
        self
    }

    pub fn with_failure(self, id: &str, error: EncoreError) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(id.to_string(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ActMetadataGateway for MockMetadataGateway {
    async fn fetch_act(&self, id: &str) -> EncoreResult<ActRecord> {
        self.calls.lock().unwrap().push(id.to_string());
        match self.responses.lock().unwrap().get(id) {
            Some(response) => response.clone(),
            None => Ok(fixtures::act_fixture(id)),
        }
    }
}

/// Event gateway answering from a script. Unscripted urls yield no events.
#[derive(Debug, Default)]
pub struct MockEventGateway {
    responses: Mutex<HashMap<String, EncoreResult<Vec<Event>>>>,
    calls: Mutex<Vec<String>>,
}

impl MockEventGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(self, url: impl Into<String>, events: Vec<Event>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), Ok(events));
        self
    }

    pub fn with_failure(self, url: impl Into<String>, error: EncoreError) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EventGateway for MockEventGateway {
    async fn fetch_events(&self, url: &str) -> EncoreResult<Vec<Event>> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.lock().unwrap().get(url) {
            Some(response) => response.clone(),
            None => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use chrono::Utc;
    use encore_core::berlin_timestamp_at;

    /// Tour-listing url used by [`touring_act_fixture`].
    pub fn listing_url(id: &str) -> String {
        format!("https://www.bandsintown.com/a/{id}")
    }

    /// An active act with no relations.
    pub fn act_fixture(id: &str) -> ActRecord {
        let mut record = ActRecord::new(id, format!("Act {id}"), ActStatus::Active);
        record.country = Some("DE".to_string());
        record
    }

    /// An active act with a tour-listing relation at [`listing_url`].
    pub fn touring_act_fixture(id: &str) -> ActRecord {
        let mut record = act_fixture(id);
        record
            .relations
            .insert(TOUR_LISTING_RELATION.to_string(), listing_url(id));
        record
    }

    /// A fully populated event `days` after today (UTC).
    pub fn event_in_days(days: i64) -> Event {
        let date = Utc::now().date_naive() + chrono::Duration::days(days);
        Event {
            name: format!("Show in {days} days"),
            date: date.format("%Y-%m-%d").to_string(),
            local_time: "20:00".to_string(),
            location: Location {
                address: "Columbiadamm 13-21, 10965, Berlin, Germany".to_string(),
                geo: Geo {
                    lat: Some(52.4839),
                    lon: Some(13.3925),
                },
            },
        }
    }

    /// Berlin timestamp `hours` before now.
    pub fn hours_ago(hours: i64) -> String {
        berlin_timestamp_at(Utc::now() - chrono::Duration::hours(hours))
    }

    /// A cached act last refreshed `hours` ago, or never when `None`.
    pub fn cached_act(id: &str, hours: Option<i64>) -> ActRecord {
        let mut record = act_fixture(id);
        record.updated_at = hours.map(hours_ago);
        record
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_fallback_status() -> impl Strategy<Value = ActStatus> {
        prop_oneof![
            Just(ActStatus::Active),
            Just(ActStatus::Disbanded),
            Just(ActStatus::Unknown),
        ]
    }

    /// Date strings that never parse as a calendar date.
    pub fn arb_garbage_date() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("TBA".to_string()),
            Just("2025-13-45".to_string()),
            "[a-z ]{1,12}",
        ]
    }

    /// Act ids shaped like MusicBrainz MBIDs.
    pub fn arb_act_id() -> impl Strategy<Value = String> {
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_scripted_store_counts_and_fails() {
        let store = ScriptedStore::with_records([act_fixture("a")]);
        assert!(store.get("a").await.unwrap().is_some());

        store.fail_reads(true);
        assert!(store.get("a").await.is_err());
        assert_eq!(store.read_count(), 2);

        store.fail_writes(true);
        assert!(store.upsert(&act_fixture("b")).await.is_err());
        store.wait_for_writes(1).await;
        assert_eq!(store.write_count(), 1);
        assert!(store.written_ids().is_empty());
    }

    #[tokio::test]
    async fn test_probe_does_not_count_as_write() {
        let store = ScriptedStore::new();
        store.probe_health().await.unwrap();
        assert_eq!(store.probe_count(), 1);
        assert_eq!(store.write_count(), 0);

        store.fail_probe(true);
        assert!(store.probe_health().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_gateways() {
        let metadata = MockMetadataGateway::new().with_failure(
            "bad",
            UpstreamError::NotFound {
                provider: "mock".to_string(),
                id: "bad".to_string(),
            }
            .into(),
        );
        assert!(metadata.fetch_act("bad").await.is_err());
        assert_eq!(metadata.fetch_act("ok").await.unwrap().name, "Act ok");
        assert_eq!(metadata.calls(), vec!["bad", "ok"]);

        let events = MockEventGateway::new().with_events(listing_url("a"), vec![event_in_days(3)]);
        assert_eq!(events.fetch_events(&listing_url("a")).await.unwrap().len(), 1);
        assert!(events.fetch_events("elsewhere").await.unwrap().is_empty());
    }

    #[test]
    fn test_cached_act_ages() {
        assert!(encore_core::is_stale(cached_act("a", None).updated_at.as_deref()));
        assert!(encore_core::is_stale(cached_act("a", Some(25)).updated_at.as_deref()));
        assert!(!encore_core::is_stale(cached_act("a", Some(12)).updated_at.as_deref()));
    }
}
