//! Stage declarations and the runner seam.

use std::time::Duration;

use async_trait::async_trait;
use flathunt_core::{AgentId, HandlerError, StoreKey};
use flathunt_store::{CoordinationRecord, NamespacedStore};

/// Default per-stage deadline when a spec does not set one.
pub const DEFAULT_STAGE_DEADLINE: Duration = Duration::from_secs(30);

/// Declaration of one pipeline stage: which agent runs it, which store
/// keys it consumes, which it must produce, and how long it may take.
///
/// Inputs and outputs are semantic keys (`agent1.candidates`); the
/// orchestrator resolves them under the run's namespace.
#[derive(Debug, Clone)]
pub struct StageSpec {
    name: String,
    agent: AgentId,
    inputs: Vec<StoreKey>,
    outputs: Vec<StoreKey>,
    deadline: Duration,
}

impl StageSpec {
    /// Start describing a stage.
    pub fn builder(name: impl Into<String>, agent: AgentId) -> StageSpecBuilder {
        StageSpecBuilder {
            name: name.into(),
            agent,
            inputs: Vec::new(),
            outputs: Vec::new(),
            deadline: DEFAULT_STAGE_DEADLINE,
        }
    }

    /// Stage name, used in reports and log spans.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The agent this stage runs as.
    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    /// Keys that must exist before the stage starts.
    pub fn inputs(&self) -> &[StoreKey] {
        &self.inputs
    }

    /// Keys the stage must have committed by the time it finishes.
    pub fn outputs(&self) -> &[StoreKey] {
        &self.outputs
    }

    /// Wall-clock budget covering input waits, execution, and output
    /// confirmation.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

/// Builder for [`StageSpec`].
#[derive(Debug)]
pub struct StageSpecBuilder {
    name: String,
    agent: AgentId,
    inputs: Vec<StoreKey>,
    outputs: Vec<StoreKey>,
    deadline: Duration,
}

impl StageSpecBuilder {
    /// Require an upstream key before the stage starts.
    pub fn input(mut self, key: StoreKey) -> Self {
        self.inputs.push(key);
        self
    }

    /// Declare a key the stage commits.
    pub fn output(mut self, key: StoreKey) -> Self {
        self.outputs.push(key);
        self
    }

    /// Override the stage deadline.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Finish the spec.
    pub fn build(self) -> StageSpec {
        StageSpec {
            name: self.name,
            agent: self.agent,
            inputs: self.inputs,
            outputs: self.outputs,
            deadline: self.deadline,
        }
    }
}

/// Everything a stage runner gets from the orchestrator: its identity,
/// a run-scoped store handle, and the already-resolved input records.
///
/// Each record is kept alongside the semantic key it was resolved for;
/// the record itself carries the namespace-qualified key.
pub struct StageContext {
    agent: AgentId,
    store: NamespacedStore,
    inputs: Vec<(StoreKey, CoordinationRecord)>,
}

impl StageContext {
    pub(crate) fn new(
        agent: AgentId,
        store: NamespacedStore,
        inputs: Vec<(StoreKey, CoordinationRecord)>,
    ) -> Self {
        Self {
            agent,
            store,
            inputs,
        }
    }

    /// The agent identity this stage runs as.
    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    /// Run-scoped store handle for reading and committing artifacts.
    pub fn store(&self) -> &NamespacedStore {
        &self.store
    }

    /// Semantic keys and input records in the order the spec declared
    /// them. The record for an input key is the latest version at the
    /// time the stage started.
    pub fn inputs(&self) -> &[(StoreKey, CoordinationRecord)] {
        &self.inputs
    }

    /// Look up an input record by the exact semantic key the spec
    /// declared it under.
    pub fn input(&self, key: &StoreKey) -> Option<&CoordinationRecord> {
        self.inputs
            .iter()
            .find(|(declared, _)| declared == key)
            .map(|(_, record)| record)
    }
}

/// The work a stage performs. Implementations write their declared
/// outputs through [`StageContext::store`]; returning `Ok` without
/// committing them fails the stage at output confirmation.
#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn run(&self, ctx: StageContext) -> Result<(), HandlerError>;
}

/// Blanket runner for plain async closures.
#[async_trait]
impl<F, Fut> StageRunner for F
where
    F: Fn(StageContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), HandlerError>> + Send,
{
    async fn run(&self, ctx: StageContext) -> Result<(), HandlerError> {
        self(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_keys_in_order() {
        let spec = StageSpec::builder("search", AgentId::parse("agent-1").unwrap())
            .input(StoreKey::parse("user_profile").unwrap())
            .output(StoreKey::parse("agent1.candidates").unwrap())
            .output(StoreKey::parse("agent1.notes").unwrap())
            .deadline(Duration::from_secs(5))
            .build();

        assert_eq!(spec.name(), "search");
        assert_eq!(spec.inputs().len(), 1);
        assert_eq!(
            spec.outputs()
                .iter()
                .map(StoreKey::as_str)
                .collect::<Vec<_>>(),
            vec!["agent1.candidates", "agent1.notes"]
        );
        assert_eq!(spec.deadline(), Duration::from_secs(5));
    }

    #[test]
    fn default_deadline_applies() {
        let spec = StageSpec::builder("x", AgentId::parse("a").unwrap()).build();
        assert_eq!(spec.deadline(), DEFAULT_STAGE_DEADLINE);
    }
}
