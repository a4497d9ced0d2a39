//! # Flathunt Core
//!
//! Core types for the flathunt multi-agent coordination layer: validated
//! identifiers, tool parameter schemas, the handler trait, the typed
//! invocation protocol, and the error taxonomy shared by the registry,
//! dispatcher, coordination store, and pipeline orchestrator.

pub mod error;
pub mod identifiers;
pub mod invocation;
pub mod schema;
pub mod tool;

pub use error::{CoordinationError, HandlerError, PipelineError, RegistrationError};
pub use identifiers::{
    AgentId, IdValidationError, RequestId, RunId, ServerName, StoreKey, ToolName,
};
pub use invocation::{InvocationRequest, InvocationResult, InvocationStatus};
pub use schema::{ParamSpec, ParamType, SchemaViolation, SchemaViolations, ToolSchema};
pub use tool::{Arguments, ToolHandler, ToolSpec};
