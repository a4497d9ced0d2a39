//! The in-memory coordination store.
//!
//! A set of independent per-key version logs, not a global transaction
//! log. Writes to one key are totally ordered by an atomically assigned
//! version; writes to different keys carry no ordering relative to each
//! other. The per-key lock is held only while a version is appended,
//! never across an agent stage.

use std::pin::Pin;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use flathunt_core::{AgentId, CoordinationError, StoreKey};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;

/// Capacity of each key's subscriber channel. A consumer that falls more
/// than this many records behind observes a [`StoreEvent::Lagged`] gap
/// instead of ever blocking the producer.
const SUBSCRIBER_BUFFER: usize = 64;

/// One committed version of a coordination artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationRecord {
    /// Semantic identifier of the artifact.
    pub key: StoreKey,
    /// The agent that wrote this version.
    pub producer: AgentId,
    /// Opaque structured payload.
    pub value: Value,
    /// Commit wall-clock time. Informational; the version number is the
    /// ordering authority.
    pub written_at: DateTime<Utc>,
    /// Per-key version, strictly increasing from 1.
    pub version: u64,
}

/// Item yielded by [`CoordinationStore::subscribe`].
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A newly committed record.
    Record(CoordinationRecord),
    /// The consumer fell behind and this many records were dropped from
    /// its view; they remain retrievable by explicit version lookup.
    Lagged(u64),
}

/// Stream of future writes to one key.
pub type RecordStream = Pin<Box<dyn Stream<Item = StoreEvent> + Send + 'static>>;

struct Slot {
    log: Vec<CoordinationRecord>,
    latest: watch::Sender<u64>,
    events: broadcast::Sender<CoordinationRecord>,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            log: Vec::new(),
            latest: watch::Sender::new(0),
            events: broadcast::Sender::new(SUBSCRIBER_BUFFER),
        }
    }
}

/// Append-only, versioned key-value store shared by all agents and the
/// orchestrator.
///
/// Safe for concurrent use without external locking. Concurrent writers
/// to the same key race on version assignment; each gets a distinct
/// version and every committed value stays retrievable by
/// [`read_version`](CoordinationStore::read_version).
#[derive(Default)]
pub struct CoordinationStore {
    slots: DashMap<StoreKey, Slot>,
}

impl CoordinationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a new version of `key`, returning the assigned version
    /// number (previous + 1, starting at 1).
    ///
    /// The per-key exclusive lock covers only the append and the
    /// visibility notifications.
    pub fn write(
        &self,
        key: &StoreKey,
        producer: &AgentId,
        value: Value,
    ) -> Result<u64, CoordinationError> {
        let mut slot = self.slots.entry(key.clone()).or_default();
        let version = slot.log.len() as u64 + 1;
        let record = CoordinationRecord {
            key: key.clone(),
            producer: producer.clone(),
            value,
            written_at: Utc::now(),
            version,
        };
        slot.log.push(record.clone());
        slot.latest.send_replace(version);
        // No receivers is fine; subscription is optional.
        let _ = slot.events.send(record);
        debug!(key = %key, producer = %producer, version, "coordination write");
        Ok(version)
    }

    /// Latest committed version of `key`, or `None` if never written.
    pub fn read(&self, key: &StoreKey) -> Option<CoordinationRecord> {
        self.slots.get(key).and_then(|slot| slot.log.last().cloned())
    }

    /// Explicit lookup of a specific version, including versions
    /// superseded by later writes.
    pub fn read_version(&self, key: &StoreKey, version: u64) -> Option<CoordinationRecord> {
        if version == 0 {
            return None;
        }
        self.slots
            .get(key)
            .and_then(|slot| slot.log.get(version as usize - 1).cloned())
    }

    /// Number of committed versions for `key` (0 if never written).
    pub fn versions(&self, key: &StoreKey) -> u64 {
        self.slots.get(key).map_or(0, |slot| slot.log.len() as u64)
    }

    /// All keys ever written, for audit.
    ///
    /// Waiting or subscribing on a key does not create it; only a
    /// committed write makes it appear here.
    pub fn keys(&self) -> Vec<StoreKey> {
        self.slots
            .iter()
            .filter(|entry| !entry.value().log.is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Suspend until `key` reaches at least `min_version`, or `timeout`
    /// elapses.
    ///
    /// Waiting parks on the key's version channel; there is no polling.
    /// Returns the latest committed record once the condition holds; its
    /// version may exceed `min_version` if later writes landed first.
    pub async fn read_at_least(
        &self,
        key: &StoreKey,
        min_version: u64,
        timeout: Duration,
    ) -> Result<CoordinationRecord, CoordinationError> {
        let mut rx = {
            let slot = self.slots.entry(key.clone()).or_default();
            slot.latest.subscribe()
        };
        let started = Instant::now();

        let waited = tokio::time::timeout(timeout, rx.wait_for(|v| *v >= min_version)).await;
        match waited {
            Ok(Ok(_)) => self.read(key).ok_or_else(|| {
                CoordinationError::StoreUnavailable(format!("slot for '{key}' disappeared"))
            }),
            Ok(Err(_closed)) => Err(CoordinationError::StoreUnavailable(format!(
                "version channel for '{key}' closed"
            ))),
            Err(_) => Err(CoordinationError::WaitTimeout {
                key: key.clone(),
                min_version,
                waited: started.elapsed(),
            }),
        }
    }

    /// Stream of writes to `key` committed after this call.
    ///
    /// Consuming the stream never blocks or suspends writers; a consumer
    /// that falls behind sees a [`StoreEvent::Lagged`] marker and resumes
    /// from the current version.
    pub fn subscribe(&self, key: &StoreKey) -> RecordStream {
        let rx = {
            let slot = self.slots.entry(key.clone()).or_default();
            slot.events.subscribe()
        };
        Box::pin(BroadcastStream::new(rx).map(|item| match item {
            Ok(record) => StoreEvent::Record(record),
            Err(BroadcastStreamRecvError::Lagged(n)) => StoreEvent::Lagged(n),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn key(s: &str) -> StoreKey {
        StoreKey::parse(s).unwrap()
    }

    fn agent(s: &str) -> AgentId {
        AgentId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn versions_increment_from_one() {
        let store = CoordinationStore::new();
        let k = key("agent1.candidates");
        let a = agent("agent-1");

        assert_eq!(store.write(&k, &a, json!({"v": 1})).unwrap(), 1);
        assert_eq!(store.write(&k, &a, json!({"v": 2})).unwrap(), 2);
        assert_eq!(store.versions(&k), 2);

        let latest = store.read(&k).unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.value, json!({"v": 2}));
    }

    #[tokio::test]
    async fn superseded_versions_stay_readable() {
        let store = CoordinationStore::new();
        let k = key("agent2.regional_stats");
        store.write(&k, &agent("agent-2"), json!("first")).unwrap();
        store.write(&k, &agent("agent-2b"), json!("second")).unwrap();

        let v1 = store.read_version(&k, 1).unwrap();
        assert_eq!(v1.value, json!("first"));
        assert_eq!(v1.producer.as_str(), "agent-2");
        assert!(store.read_version(&k, 0).is_none());
        assert!(store.read_version(&k, 3).is_none());
    }

    #[tokio::test]
    async fn read_of_unwritten_key_is_none() {
        let store = CoordinationStore::new();
        assert!(store.read(&key("never.written")).is_none());
        assert_eq!(store.versions(&key("never.written")), 0);
    }

    #[tokio::test]
    async fn read_at_least_returns_immediately_when_satisfied() {
        let store = CoordinationStore::new();
        let k = key("k");
        store.write(&k, &agent("a"), json!(1)).unwrap();

        let record = store
            .read_at_least(&k, 1, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(record.version, 1);
    }

    #[tokio::test]
    async fn read_at_least_unblocks_only_at_target_version() {
        let store = Arc::new(CoordinationStore::new());
        let k = key("agent1.candidates");

        let waiter = {
            let store = Arc::clone(&store);
            let k = k.clone();
            tokio::spawn(async move { store.read_at_least(&k, 2, Duration::from_secs(2)).await })
        };
        // Let the waiter park before any write lands.
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.write(&k, &agent("p1"), json!("v1")).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "must not unblock on version 1");

        store.write(&k, &agent("p2"), json!("v2")).unwrap();
        let record = waiter.await.unwrap().unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.value, json!("v2"));
    }

    #[tokio::test]
    async fn read_at_least_times_out_as_data() {
        let store = CoordinationStore::new();
        let err = store
            .read_at_least(&key("missing"), 1, Duration::from_millis(30))
            .await
            .unwrap_err();
        match err {
            CoordinationError::WaitTimeout { min_version, .. } => assert_eq!(min_version, 1),
            other => panic!("expected WaitTimeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn keys_lists_only_written_keys() {
        let store = CoordinationStore::new();
        store.write(&key("written"), &agent("a"), json!(1)).unwrap();

        // Waiting and subscribing allocate slots but commit nothing.
        let _ = store
            .read_at_least(&key("awaited"), 1, Duration::from_millis(10))
            .await;
        let _stream = store.subscribe(&key("watched"));

        assert_eq!(store.keys(), vec![key("written")]);
    }

    #[tokio::test]
    async fn subscribe_sees_future_writes_in_order() {
        let store = CoordinationStore::new();
        let k = key("feed");
        store.write(&k, &agent("a"), json!("before")).unwrap();

        let mut stream = store.subscribe(&k);
        store.write(&k, &agent("a"), json!("x")).unwrap();
        store.write(&k, &agent("a"), json!("y")).unwrap();

        for (expected_version, expected_value) in [(2, json!("x")), (3, json!("y"))] {
            match stream.next().await.unwrap() {
                StoreEvent::Record(record) => {
                    assert_eq!(record.version, expected_version);
                    assert_eq!(record.value, expected_value);
                }
                StoreEvent::Lagged(n) => panic!("unexpected lag of {n}"),
            }
        }
    }

    #[tokio::test]
    async fn concurrent_writers_get_distinct_versions() {
        let store = Arc::new(CoordinationStore::new());
        let k = key("contended");

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let k = k.clone();
            tasks.push(tokio::spawn(async move {
                store.write(&k, &agent("w"), json!(i)).unwrap()
            }));
        }

        let mut versions = Vec::new();
        for task in tasks {
            versions.push(task.await.unwrap());
        }
        versions.sort_unstable();
        assert_eq!(versions, (1..=16).collect::<Vec<u64>>());
        assert_eq!(store.versions(&k), 16);
    }
}
