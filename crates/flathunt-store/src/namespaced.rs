//! Run-scoped view over the shared store.

use std::sync::Arc;
use std::time::Duration;

use flathunt_core::{AgentId, CoordinationError, RunId, StoreKey};
use serde_json::Value;

use crate::store::{CoordinationRecord, CoordinationStore, RecordStream};

/// A handle that transparently prefixes every key with a run namespace.
///
/// Two concurrent pipeline runs using the same semantic keys
/// (`agent1.candidates` and friends) land in disjoint slots of the
/// underlying store, and a finished run's records stay readable for
/// audit under its own prefix.
#[derive(Clone)]
pub struct NamespacedStore {
    inner: Arc<CoordinationStore>,
    run: RunId,
    ns: String,
}

impl NamespacedStore {
    /// Scope `inner` to the given run.
    pub fn new(inner: Arc<CoordinationStore>, run: RunId) -> Self {
        let ns = run.namespace();
        Self { inner, run, ns }
    }

    /// The run this handle is scoped to.
    pub fn run_id(&self) -> RunId {
        self.run
    }

    /// The concrete store key a semantic key maps to under this run.
    pub fn qualify(&self, key: &StoreKey) -> Result<StoreKey, CoordinationError> {
        key.namespaced(&self.ns)
            .map_err(|e| CoordinationError::StoreUnavailable(format!("bad namespace: {e}")))
    }

    /// See [`CoordinationStore::write`].
    pub fn write(
        &self,
        key: &StoreKey,
        producer: &AgentId,
        value: Value,
    ) -> Result<u64, CoordinationError> {
        self.inner.write(&self.qualify(key)?, producer, value)
    }

    /// See [`CoordinationStore::read`].
    pub fn read(&self, key: &StoreKey) -> Result<Option<CoordinationRecord>, CoordinationError> {
        Ok(self.inner.read(&self.qualify(key)?))
    }

    /// See [`CoordinationStore::read_version`].
    pub fn read_version(
        &self,
        key: &StoreKey,
        version: u64,
    ) -> Result<Option<CoordinationRecord>, CoordinationError> {
        Ok(self.inner.read_version(&self.qualify(key)?, version))
    }

    /// See [`CoordinationStore::versions`].
    pub fn versions(&self, key: &StoreKey) -> Result<u64, CoordinationError> {
        Ok(self.inner.versions(&self.qualify(key)?))
    }

    /// See [`CoordinationStore::read_at_least`].
    pub async fn read_at_least(
        &self,
        key: &StoreKey,
        min_version: u64,
        timeout: Duration,
    ) -> Result<CoordinationRecord, CoordinationError> {
        self.inner
            .read_at_least(&self.qualify(key)?, min_version, timeout)
            .await
    }

    /// See [`CoordinationStore::subscribe`].
    pub fn subscribe(&self, key: &StoreKey) -> Result<RecordStream, CoordinationError> {
        Ok(self.inner.subscribe(&self.qualify(key)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(s: &str) -> StoreKey {
        StoreKey::parse(s).unwrap()
    }

    fn agent(s: &str) -> AgentId {
        AgentId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn runs_are_isolated() {
        let shared = Arc::new(CoordinationStore::new());
        let run_a = NamespacedStore::new(Arc::clone(&shared), RunId::new());
        let run_b = NamespacedStore::new(Arc::clone(&shared), RunId::new());
        let k = key("agent1.candidates");

        run_a.write(&k, &agent("a1"), json!("for-a")).unwrap();

        assert!(run_b.read(&k).unwrap().is_none());
        let seen = run_a.read(&k).unwrap().unwrap();
        assert_eq!(seen.value, json!("for-a"));
        assert_eq!(seen.version, 1);
    }

    #[tokio::test]
    async fn qualified_key_carries_run_prefix() {
        let shared = Arc::new(CoordinationStore::new());
        let scoped = NamespacedStore::new(Arc::clone(&shared), RunId::new());
        let k = key("viewing_schedule");

        scoped.write(&k, &agent("coordinator"), json!({})).unwrap();

        let qualified = scoped.qualify(&k).unwrap();
        assert!(qualified.as_str().starts_with("run-"));
        assert!(qualified.as_str().ends_with(":viewing_schedule"));
        // The underlying store sees the prefixed key, not the bare one.
        assert!(shared.read(&k).is_none());
        assert!(shared.read(&qualified).is_some());
    }

    #[tokio::test]
    async fn wait_works_through_the_namespace() {
        let shared = Arc::new(CoordinationStore::new());
        let scoped = NamespacedStore::new(shared, RunId::new());
        let k = key("agent2.insights");

        let waiter = {
            let scoped = scoped.clone();
            let k = k.clone();
            tokio::spawn(
                async move { scoped.read_at_least(&k, 1, Duration::from_secs(1)).await },
            )
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        scoped.write(&k, &agent("agent-2"), json!("ready")).unwrap();

        let record = waiter.await.unwrap().unwrap();
        assert_eq!(record.value, json!("ready"));
    }
}
