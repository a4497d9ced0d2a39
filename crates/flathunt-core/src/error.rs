//! Error taxonomy for the coordination layer.
//!
//! Registration errors are fatal at startup: the process must not run with
//! a partially built registry. Invocation outcomes are returned as data
//! (`InvocationResult`), so the only error types here are the ones that
//! cross a `Result` seam: handler failures, coordination-store waits, and
//! pipeline-level stage failures. Nothing in this layer retries
//! automatically; only the caller knows which operations are safe to
//! repeat.

use std::time::Duration;
use thiserror::Error;

use crate::identifiers::{ServerName, StoreKey, ToolName};

/// Errors raised while building the tool registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Two servers declared the same tool name; the flat index would be
    /// ambiguous. The incoming server is rejected whole.
    #[error(
        "duplicate tool name '{tool}': already provided by server '{existing_server}', \
         rejected from server '{incoming_server}'"
    )]
    DuplicateToolName {
        tool: ToolName,
        existing_server: ServerName,
        incoming_server: ServerName,
    },

    /// A server with this name is already registered; re-registration
    /// would silently mutate the tool set mid-session.
    #[error("server '{server}' is already registered")]
    AlreadyRegistered { server: ServerName },
}

/// Failures a tool handler may raise.
///
/// The dispatcher converts these into `execution_error` results; they
/// never propagate to the calling agent as Rust errors.
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    /// The operation ran and failed.
    #[error("{0}")]
    Failed(String),

    /// The backing capability is unreachable or not configured.
    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

impl HandlerError {
    /// Shorthand for a failed operation.
    pub fn failed(detail: impl Into<String>) -> Self {
        HandlerError::Failed(detail.into())
    }

    /// Shorthand for an unavailable capability.
    pub fn unavailable(detail: impl Into<String>) -> Self {
        HandlerError::Unavailable(detail.into())
    }
}

/// Errors from coordination-store operations.
#[derive(Error, Debug, Clone)]
pub enum CoordinationError {
    /// The store cannot serve requests.
    #[error("coordination store unavailable: {0}")]
    StoreUnavailable(String),

    /// `read_at_least` gave up before the awaited version appeared.
    #[error("timed out after {waited:?} waiting for '{key}' to reach version {min_version}")]
    WaitTimeout {
        key: StoreKey,
        min_version: u64,
        waited: Duration,
    },
}

/// Pipeline-level failures surfaced to the run's caller.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// A stage did not produce its declared output within its deadline.
    /// The run halts; the stage is not retried, since re-running an agent
    /// stage may re-trigger non-idempotent external side effects.
    #[error("stage '{stage}' missed its {deadline:?} deadline waiting on key '{key}'")]
    StageDeadlineExceeded {
        stage: String,
        key: StoreKey,
        deadline: Duration,
    },

    /// The stage runner itself reported failure.
    #[error("stage '{stage}' failed: {detail}")]
    StageFailed { stage: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tool_name_display() {
        let err = RegistrationError::DuplicateToolName {
            tool: ToolName::parse("send_email").unwrap(),
            existing_server: ServerName::parse("messaging").unwrap(),
            incoming_server: ServerName::parse("messaging-v2").unwrap(),
        };
        let text = err.to_string();
        assert!(text.contains("send_email"));
        assert!(text.contains("messaging"));
        assert!(text.contains("messaging-v2"));
    }

    #[test]
    fn wait_timeout_display() {
        let err = CoordinationError::WaitTimeout {
            key: StoreKey::parse("agent1.candidates").unwrap(),
            min_version: 2,
            waited: Duration::from_millis(250),
        };
        let text = err.to_string();
        assert!(text.contains("agent1.candidates"));
        assert!(text.contains("version 2"));
    }

    #[test]
    fn stage_deadline_display() {
        let err = PipelineError::StageDeadlineExceeded {
            stage: "property-intelligence".into(),
            key: StoreKey::parse("agent1.candidates").unwrap(),
            deadline: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("property-intelligence"));
    }
}
