//! # Flathunt Pipeline
//!
//! The orchestrator that runs the apartment-hunt agent sequence. Each
//! stage is declared up front with the store keys it consumes and
//! produces; the [`Orchestrator`] enforces those data dependencies over
//! a shared [`flathunt_store::CoordinationStore`] and halts the run on
//! the first stage that misses its contract.

pub mod orchestrator;
pub mod stage;

pub use orchestrator::{Orchestrator, PipelineReport, RunState, StageReport};
pub use stage::{DEFAULT_STAGE_DEADLINE, StageContext, StageRunner, StageSpec, StageSpecBuilder};
