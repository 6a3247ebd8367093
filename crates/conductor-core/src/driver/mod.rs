//! Run driver: the lifecycle state machine
//!
//! One internal transition function — resolve the current required action,
//! submit the full batch, continue — consumed by two adapters: a polling
//! loop (`poll`) and a streaming subscriber (`stream`). Both produce the
//! same externally observable transitions.

mod poll;
mod stream;

pub use stream::TurnStream;

use crate::error::{ConductorError, ConductorResult};
use crate::run::{RequiredAction, Run, RunError, RunStatus};
use crate::service::AgentService;
use crate::tools::{
    ApprovalGate, ApprovalRequest, LocalCallBudget, ToolCatalog, ToolInvoker, ToolOutcome,
    ToolOutput,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tuning for the run driver
#[derive(Debug, Clone)]
pub struct RunDriverConfig {
    /// Fixed wait between status fetches in polling mode
    pub poll_interval: Duration,
    /// Transient transport failures tolerated per fetch before giving up
    pub transport_retry_limit: u32,
    /// Base backoff between transport retries, scaled by attempt number
    pub transport_backoff: Duration,
    /// Consecutive local-function calls allowed per run
    pub local_call_limit: u32,
}

impl Default for RunDriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            transport_retry_limit: 3,
            transport_backoff: Duration::from_millis(250),
            local_call_limit: crate::tools::DEFAULT_LOCAL_CALL_LIMIT,
        }
    }
}

/// The resolved batch for one required action
///
/// An action resolves either to tool outputs or to approval decisions,
/// submitted in full: the driver never sends a partial batch.
enum Submission {
    Outputs(Vec<ToolOutput>),
    Approvals(Vec<ApprovalRequest>),
}

struct DriverInner {
    service: Arc<dyn AgentService>,
    invoker: ToolInvoker,
    gate: Arc<ApprovalGate>,
    config: RunDriverConfig,
    cancel: Mutex<CancellationToken>,
}

/// Drives a run through its lifecycle, dispatching tool actions
///
/// Cheap to clone; clones share the same cancellation state and gate.
#[derive(Clone)]
pub struct RunDriver {
    inner: Arc<DriverInner>,
}

impl RunDriver {
    /// Create a driver with default configuration
    pub fn new(
        service: Arc<dyn AgentService>,
        catalog: Arc<ToolCatalog>,
        gate: Arc<ApprovalGate>,
    ) -> Self {
        Self::with_config(service, catalog, gate, RunDriverConfig::default())
    }

    /// Create a driver with explicit configuration
    pub fn with_config(
        service: Arc<dyn AgentService>,
        catalog: Arc<ToolCatalog>,
        gate: Arc<ApprovalGate>,
        config: RunDriverConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DriverInner {
                service,
                invoker: ToolInvoker::new(catalog),
                gate,
                config,
                cancel: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    /// The approval gate used for remote tool calls
    pub fn gate(&self) -> &Arc<ApprovalGate> {
        &self.inner.gate
    }

    /// The driver configuration
    pub fn config(&self) -> &RunDriverConfig {
        &self.inner.config
    }

    /// Request cooperative cancellation of the turn in flight
    ///
    /// Checked between polls and stream reads; an in-flight tool
    /// invocation is never preempted.
    pub fn cancel(&self) {
        self.inner.cancel.lock().cancel();
    }

    /// Start a turn: installs and returns a fresh cancellation token
    fn begin_turn(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.inner.cancel.lock() = token.clone();
        token
    }

    fn service(&self) -> &Arc<dyn AgentService> {
        &self.inner.service
    }

    /// Resolve every call of the current required action into one batch
    async fn resolve_action(
        &self,
        run: &Run,
        budget: &LocalCallBudget,
        cancel: &CancellationToken,
    ) -> ConductorResult<Submission> {
        let action = run.required_action.as_ref().ok_or_else(|| {
            ConductorError::invalid_state("run requires action but carries none")
        })?;

        match action {
            RequiredAction::SubmitToolOutputs { calls } => {
                let outcomes = self.inner.invoker.invoke_batch(calls, budget).await?;
                let outputs = outcomes
                    .into_iter()
                    .map(|outcome| match outcome {
                        ToolOutcome::Output(output) => output,
                        ToolOutcome::InvocationError {
                            call_id, reason, ..
                        } => ToolOutput::failure(call_id, reason),
                        ToolOutcome::NeedsApproval(request) => ToolOutput::failure(
                            request.call_id,
                            "tool requires approval and cannot return an output directly",
                        ),
                    })
                    .collect();
                Ok(Submission::Outputs(outputs))
            }
            RequiredAction::SubmitToolApprovals { calls } => {
                let mut rejected = Vec::new();
                for call in calls {
                    match self.inner.invoker.invoke(call, budget).await? {
                        ToolOutcome::NeedsApproval(request) => self.inner.gate.stage(request),
                        _ => {
                            tracing::warn!(
                                tool = %call.name,
                                "approval requested for a tool that is not a registered remote tool"
                            );
                            let mut request = ApprovalRequest::new(&call.id, &call.name);
                            request.approved = Some(false);
                            rejected.push(request);
                        }
                    }
                }

                // Every approval of this action must be resolved before
                // anything is resubmitted.
                tokio::select! {
                    _ = cancel.cancelled() => {
                        self.inner.gate.discard();
                        return Err(ConductorError::Cancelled);
                    }
                    _ = self.inner.gate.resolved() => {}
                }

                let mut approvals = self.inner.gate.drain();
                approvals.extend(rejected);
                Ok(Submission::Approvals(approvals))
            }
        }
    }

    /// Best-effort cancellation of the backing run
    async fn cancel_backing_run(&self, run: &Run) -> ConductorResult<Run> {
        self.inner.gate.discard();
        match self.service().cancel_run(&run.thread_id, &run.id).await {
            Ok(cancelled) => Ok(cancelled),
            Err(err) => {
                tracing::warn!(run_id = %run.id, error = %err, "best-effort cancel failed");
                let mut run = run.clone();
                run.status = RunStatus::Cancelled;
                run.required_action = None;
                Ok(run)
            }
        }
    }

    /// Terminate the run locally after a policy breach (e.g. call limit)
    async fn fail_run_locally(&self, run: &Run, err: ConductorError) -> ConductorResult<Run> {
        let code = match &err {
            ConductorError::ToolCallLimitExceeded { .. } => "tool_call_limit_exceeded",
            _ => "local_failure",
        };
        tracing::error!(run_id = %run.id, error = %err, "terminating run locally");
        if let Err(cancel_err) = self.service().cancel_run(&run.thread_id, &run.id).await {
            tracing::warn!(run_id = %run.id, error = %cancel_err, "best-effort cancel failed");
        }
        let mut run = run.clone();
        run.status = RunStatus::Failed;
        run.required_action = None;
        run.last_error = Some(RunError::new(code, err.to_string()));
        Ok(run)
    }
}
