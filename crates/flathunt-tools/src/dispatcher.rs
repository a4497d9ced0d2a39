//! The validating, timeout-bounded dispatcher.
//!
//! One entry point: [`Dispatcher::invoke`]. Resolution, schema validation,
//! execution, and timeout handling all fold into an [`InvocationResult`];
//! no error ever crosses the dispatch boundary as a Rust error, so the
//! reasoning layer can always inspect the outcome and decide whether a
//! retry is semantically safe. The dispatcher itself never retries and
//! never deduplicates by request id; most wrapped vendor operations are
//! not idempotent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use flathunt_core::{InvocationRequest, InvocationResult};
use tracing::{info, warn};

use crate::registry::ToolRegistry;

/// Default grace period granted to a cancelled handler to wind down.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(250);

/// Resolves invocation requests against the registry and executes them
/// under validation and timeout control.
///
/// Cheap to clone; safe for concurrent use from any number of stages.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    grace_period: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over a built registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Override the cancellation grace period.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// The registry this dispatcher resolves against.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke a tool, bounded by `timeout`.
    ///
    /// The caller is suspended for at most `timeout` plus the grace
    /// period. At timeout expiry the handler task is aborted (cooperative:
    /// it stops at its next await point) and the grace period is spent
    /// waiting for it to acknowledge; the timeout result is returned
    /// regardless of whether it did. Side effects the handler already
    /// performed are not rolled back.
    pub async fn invoke(&self, request: InvocationRequest, timeout: Duration) -> InvocationResult {
        let started = Instant::now();
        let InvocationRequest {
            request_id,
            tool_name,
            arguments,
            caller,
        } = request;

        let result = match self.registry.resolve(&tool_name) {
            None => InvocationResult::not_found(request_id, &tool_name, started.elapsed()),
            Some((_server, tool)) => match tool.schema().validate(&arguments) {
                Err(violations) => InvocationResult::validation_error(
                    request_id,
                    violations.to_string(),
                    started.elapsed(),
                ),
                Ok(()) => {
                    let handler = tool.handler();
                    let mut task = tokio::spawn(async move { handler.handle(arguments).await });
                    match tokio::time::timeout(timeout, &mut task).await {
                        Ok(Ok(Ok(payload))) => {
                            InvocationResult::success(request_id, payload, started.elapsed())
                        }
                        Ok(Ok(Err(err))) => InvocationResult::execution_error(
                            request_id,
                            err.to_string(),
                            started.elapsed(),
                        ),
                        Ok(Err(join_err)) => InvocationResult::execution_error(
                            request_id,
                            format!("handler panicked: {join_err}"),
                            started.elapsed(),
                        ),
                        Err(_) => {
                            task.abort();
                            let _ = tokio::time::timeout(self.grace_period, &mut task).await;
                            InvocationResult::timed_out(request_id, timeout, started.elapsed())
                        }
                    }
                }
            },
        };

        // Every attempt is traced, regardless of outcome.
        let elapsed_ms = result.elapsed.as_millis() as u64;
        if result.is_success() {
            info!(
                request_id = %request_id,
                tool = %tool_name,
                caller = %caller,
                status = result.status.as_str(),
                elapsed_ms,
                "tool invocation"
            );
        } else {
            warn!(
                request_id = %request_id,
                tool = %tool_name,
                caller = %caller,
                status = result.status.as_str(),
                elapsed_ms,
                detail = result.error_detail.as_deref().unwrap_or(""),
                "tool invocation failed"
            );
        }

        result
    }
}
