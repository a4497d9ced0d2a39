//! Sequential stage execution over the shared coordination store.
//!
//! Stages hand results to each other only through the store. The
//! orchestrator enforces the data-dependency contract around each stage:
//! inputs must exist before the runner starts, declared outputs must be
//! committed before the next stage is considered, and the whole envelope
//! fits in the stage deadline. A failed stage halts the run; nothing is
//! retried, since re-running an agent stage may re-trigger external side
//! effects that are not idempotent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use flathunt_core::{CoordinationError, PipelineError, RunId, StoreKey};
use flathunt_store::{CoordinationStore, NamespacedStore};
use tracing::{Instrument, info, info_span, warn};

use crate::stage::{StageContext, StageRunner, StageSpec};

/// Lifecycle of one pipeline run. `Failed` is absorbing and `Complete`
/// is terminal; a report never moves out of either.
#[derive(Debug, Clone)]
pub enum RunState {
    /// No stage has started.
    Pending,
    /// The named stage is executing.
    Running { stage: String },
    /// Every stage finished and confirmed its outputs.
    Complete,
    /// The named stage failed; later stages were never started.
    Failed {
        stage: String,
        error: PipelineError,
    },
}

impl RunState {
    /// Whether the run finished with every stage confirmed.
    pub fn is_complete(&self) -> bool {
        matches!(self, RunState::Complete)
    }

    /// Whether the run halted on a stage failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, RunState::Failed { .. })
    }
}

/// Per-stage accounting in a [`PipelineReport`].
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Stage name from its spec.
    pub stage: String,
    /// Wall-clock time from input gathering to output confirmation.
    pub elapsed: Duration,
    /// Confirmed output keys with the version each reached, in spec
    /// order. Keys are fully qualified under the run namespace.
    pub output_versions: Vec<(StoreKey, u64)>,
    /// The failure that halted this stage, if any.
    pub error: Option<PipelineError>,
}

/// Outcome of one pipeline run.
///
/// Whatever the final state, every store write the run performed stays
/// readable under the run's namespace for audit.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub state: RunState,
    pub stage_reports: Vec<StageReport>,
}

/// Drives a declared sequence of stages over a shared store.
pub struct Orchestrator {
    store: Arc<CoordinationStore>,
}

impl Orchestrator {
    /// Orchestrate over the given store.
    pub fn new(store: Arc<CoordinationStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for seeding inputs and post-run inspection.
    pub fn store(&self) -> &Arc<CoordinationStore> {
        &self.store
    }

    /// Execute `stages` in order under a fresh run namespace.
    ///
    /// Failures are reported in the returned [`PipelineReport`] rather
    /// than as an `Err`; callers inspect `state` to decide what to do.
    pub async fn run(&self, stages: Vec<(StageSpec, Arc<dyn StageRunner>)>) -> PipelineReport {
        let run_id = RunId::new();
        let span = info_span!("pipeline_run", run = %run_id, stages = stages.len());
        self.run_inner(run_id, stages).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        stages: Vec<(StageSpec, Arc<dyn StageRunner>)>,
    ) -> PipelineReport {
        let scoped = NamespacedStore::new(Arc::clone(&self.store), run_id);
        let mut state = RunState::Pending;
        let mut stage_reports = Vec::with_capacity(stages.len());

        for (spec, runner) in stages {
            state = RunState::Running {
                stage: spec.name().to_string(),
            };
            let span = info_span!("pipeline_stage", stage = spec.name(), agent = %spec.agent());
            let report = self
                .run_stage(&scoped, &spec, runner)
                .instrument(span)
                .await;

            let failed = report.error.clone();
            stage_reports.push(report);
            if let Some(error) = failed {
                warn!(stage = spec.name(), %error, "pipeline run halted");
                state = RunState::Failed {
                    stage: spec.name().to_string(),
                    error,
                };
                break;
            }
        }

        if !state.is_failed() {
            state = RunState::Complete;
            info!(run = %run_id, "pipeline run complete");
        }

        PipelineReport {
            run_id,
            state,
            stage_reports,
        }
    }

    async fn run_stage(
        &self,
        scoped: &NamespacedStore,
        spec: &StageSpec,
        runner: Arc<dyn StageRunner>,
    ) -> StageReport {
        let started = Instant::now();
        let deadline = spec.deadline();
        let fail = |error: PipelineError, started: Instant| StageReport {
            stage: spec.name().to_string(),
            elapsed: started.elapsed(),
            output_versions: Vec::new(),
            error: Some(error),
        };

        // Inputs must already be committed; a stage never starts on
        // missing upstream data.
        let mut inputs = Vec::with_capacity(spec.inputs().len());
        for key in spec.inputs() {
            let remaining = deadline.saturating_sub(started.elapsed());
            match scoped.read_at_least(key, 1, remaining).await {
                Ok(record) => inputs.push((key.clone(), record)),
                Err(CoordinationError::WaitTimeout { .. }) => {
                    return fail(
                        PipelineError::StageDeadlineExceeded {
                            stage: spec.name().to_string(),
                            key: key.clone(),
                            deadline,
                        },
                        started,
                    );
                }
                Err(other) => {
                    return fail(
                        PipelineError::StageFailed {
                            stage: spec.name().to_string(),
                            detail: other.to_string(),
                        },
                        started,
                    );
                }
            }
        }

        let ctx = StageContext::new(spec.agent().clone(), scoped.clone(), inputs);
        let remaining = deadline.saturating_sub(started.elapsed());
        match tokio::time::timeout(remaining, runner.run(ctx)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return fail(
                    PipelineError::StageFailed {
                        stage: spec.name().to_string(),
                        detail: err.to_string(),
                    },
                    started,
                );
            }
            Err(_elapsed) => {
                let error = match spec.outputs().first() {
                    Some(key) => PipelineError::StageDeadlineExceeded {
                        stage: spec.name().to_string(),
                        key: key.clone(),
                        deadline,
                    },
                    None => PipelineError::StageFailed {
                        stage: spec.name().to_string(),
                        detail: format!("runner still executing after {deadline:?}"),
                    },
                };
                return fail(error, started);
            }
        }

        // Confirm the contract: every declared output has at least one
        // committed version.
        let mut output_versions = Vec::with_capacity(spec.outputs().len());
        for key in spec.outputs() {
            let remaining = deadline.saturating_sub(started.elapsed());
            match scoped.read_at_least(key, 1, remaining).await {
                Ok(record) => output_versions.push((record.key.clone(), record.version)),
                Err(CoordinationError::WaitTimeout { .. }) => {
                    return fail(
                        PipelineError::StageDeadlineExceeded {
                            stage: spec.name().to_string(),
                            key: key.clone(),
                            deadline,
                        },
                        started,
                    );
                }
                Err(other) => {
                    return fail(
                        PipelineError::StageFailed {
                            stage: spec.name().to_string(),
                            detail: other.to_string(),
                        },
                        started,
                    );
                }
            }
        }

        let elapsed = started.elapsed();
        info!(
            stage = spec.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            outputs = output_versions.len(),
            "stage complete"
        );
        StageReport {
            stage: spec.name().to_string(),
            elapsed,
            output_versions,
            error: None,
        }
    }
}
