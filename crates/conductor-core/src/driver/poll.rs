//! Polling adapter for the run driver

use super::{RunDriver, Submission};
use crate::error::{ConductorError, ConductorResult};
use crate::run::{Run, RunStatus};
use crate::service::ToolResources;
use crate::tools::LocalCallBudget;
use tokio_util::sync::CancellationToken;

impl RunDriver {
    /// Execute one run to a terminal status by polling
    ///
    /// Fetches the run once per interval, resolves required actions as
    /// they appear, and stops immediately on a terminal status. Transient
    /// transport failures are retried with backoff up to the configured
    /// attempt limit.
    pub async fn run_polled(
        &self,
        thread_id: &str,
        agent_id: &str,
        resources: Option<ToolResources>,
    ) -> ConductorResult<Run> {
        let cancel = self.begin_turn();
        let budget = LocalCallBudget::new(self.config().local_call_limit);

        let mut run = self
            .service()
            .create_run(thread_id, agent_id, resources)
            .await?;
        tracing::debug!(run_id = %run.id, thread_id, "run created");

        loop {
            if cancel.is_cancelled() {
                return self.cancel_backing_run(&run).await;
            }
            match run.status {
                RunStatus::Queued | RunStatus::InProgress => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return self.cancel_backing_run(&run).await;
                        }
                        _ = tokio::time::sleep(self.config().poll_interval) => {}
                    }
                    run = match self.fetch_with_retry(thread_id, &run.id, &cancel).await {
                        Ok(run) => run,
                        Err(ConductorError::Cancelled) => {
                            return self.cancel_backing_run(&run).await;
                        }
                        Err(err) => return Err(err),
                    };
                }
                RunStatus::RequiresAction => {
                    run = match self.advance_action(&run, &budget, &cancel).await {
                        Ok(run) => run,
                        Err(ConductorError::Cancelled) => {
                            return self.cancel_backing_run(&run).await;
                        }
                        Err(err @ ConductorError::ToolCallLimitExceeded { .. }) => {
                            return self.fail_run_locally(&run, err).await;
                        }
                        Err(err) => return Err(err),
                    };
                }
                RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled => {
                    tracing::debug!(run_id = %run.id, status = ?run.status, "run reached terminal status");
                    return Ok(run);
                }
            }
        }
    }

    /// Resolve the current action and submit the batch, returning the
    /// advanced run
    async fn advance_action(
        &self,
        run: &Run,
        budget: &LocalCallBudget,
        cancel: &CancellationToken,
    ) -> ConductorResult<Run> {
        match self.resolve_action(run, budget, cancel).await? {
            Submission::Outputs(outputs) => {
                self.service()
                    .submit_tool_outputs(&run.thread_id, &run.id, outputs)
                    .await
            }
            Submission::Approvals(approvals) => {
                self.service()
                    .submit_tool_approvals(&run.thread_id, &run.id, approvals)
                    .await
            }
        }
    }

    /// Fetch the run, retrying transient transport failures with backoff
    async fn fetch_with_retry(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> ConductorResult<Run> {
        let mut attempt: u32 = 0;
        loop {
            match self.service().get_run(thread_id, run_id).await {
                Ok(run) => return Ok(run),
                Err(err) if err.is_retryable() && attempt < self.config().transport_retry_limit => {
                    attempt += 1;
                    tracing::warn!(run_id, attempt, error = %err, "transient fetch failure; retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ConductorError::Cancelled),
                        _ = tokio::time::sleep(self.config().transport_backoff * attempt) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
