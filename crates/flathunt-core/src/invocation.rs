//! The typed invocation protocol between agents and the dispatcher.
//!
//! Invocation outcomes are always returned as data, never thrown across
//! the dispatch boundary, so a reasoning layer can inspect a failure and
//! decide for itself whether repeating the call is safe.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::identifiers::{AgentId, RequestId, ToolName};
use crate::tool::Arguments;

/// A request to invoke a named tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Unique per-request identifier, carried through tracing output.
    pub request_id: RequestId,
    /// Fully-qualified tool name to resolve against the registry.
    pub tool_name: ToolName,
    /// Named arguments, validated against the tool's schema before dispatch.
    pub arguments: Arguments,
    /// The agent issuing the request.
    pub caller: AgentId,
}

impl InvocationRequest {
    /// Build a request with a freshly generated request id.
    pub fn new(tool_name: ToolName, arguments: Arguments, caller: AgentId) -> Self {
        Self {
            request_id: RequestId::new(),
            tool_name,
            arguments,
            caller,
        }
    }
}

/// Outcome category of one invocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// Handler ran and returned a payload.
    Success,
    /// The tool name resolved to nothing.
    NotFound,
    /// Arguments failed schema validation; the handler was never called.
    ValidationError,
    /// The handler failed, or the call exceeded its timeout.
    ExecutionError,
}

impl InvocationStatus {
    /// Short label for log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationStatus::Success => "success",
            InvocationStatus::NotFound => "not_found",
            InvocationStatus::ValidationError => "validation_error",
            InvocationStatus::ExecutionError => "execution_error",
        }
    }
}

/// Structured result of one invocation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Echo of the originating request id.
    pub request_id: RequestId,
    /// Outcome category.
    pub status: InvocationStatus,
    /// Opaque structured payload, present on success.
    pub payload: Option<serde_json::Value>,
    /// Human-readable cause, present on failure.
    pub error_detail: Option<String>,
    /// Wall-clock time the attempt took, including validation.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl InvocationResult {
    /// Successful invocation with the handler's payload.
    pub fn success(request_id: RequestId, payload: serde_json::Value, elapsed: Duration) -> Self {
        Self {
            request_id,
            status: InvocationStatus::Success,
            payload: Some(payload),
            error_detail: None,
            elapsed,
        }
    }

    /// The requested tool is not in the registry.
    pub fn not_found(request_id: RequestId, tool_name: &ToolName, elapsed: Duration) -> Self {
        Self {
            request_id,
            status: InvocationStatus::NotFound,
            payload: None,
            error_detail: Some(format!("tool not found: {tool_name}")),
            elapsed,
        }
    }

    /// Arguments failed schema validation.
    pub fn validation_error(request_id: RequestId, detail: String, elapsed: Duration) -> Self {
        Self {
            request_id,
            status: InvocationStatus::ValidationError,
            payload: None,
            error_detail: Some(detail),
            elapsed,
        }
    }

    /// The handler raised a failure.
    pub fn execution_error(request_id: RequestId, detail: String, elapsed: Duration) -> Self {
        Self {
            request_id,
            status: InvocationStatus::ExecutionError,
            payload: None,
            error_detail: Some(detail),
            elapsed,
        }
    }

    /// The handler exceeded its timeout and was cancelled.
    pub fn timed_out(request_id: RequestId, timeout: Duration, elapsed: Duration) -> Self {
        Self {
            request_id,
            status: InvocationStatus::ExecutionError,
            payload: None,
            error_detail: Some(format!("timed out after {}ms", timeout.as_millis())),
            elapsed,
        }
    }

    /// Whether the attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }

    /// Whether the failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        self.status == InvocationStatus::ExecutionError
            && self
                .error_detail
                .as_deref()
                .is_some_and(|d| d.starts_with("timed out"))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
