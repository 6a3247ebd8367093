//! Streaming adapter for the run driver

use super::{RunDriver, Submission};
use crate::error::{ConductorError, ConductorResult};
use crate::run::{Run, RunUpdate};
use crate::service::ToolResources;
use crate::tools::LocalCallBudget;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// The text chunks of one streamed run
///
/// Lazy, ordered, single-pass: chunks arrive as the agent produces them
/// and the sequence ends exactly when the run reaches a terminal status.
/// Not restartable; replaying requires a fresh run. A mid-stream run
/// failure is yielded in-band as the final `Err` item.
pub struct TurnStream {
    chunks: ReceiverStream<ConductorResult<String>>,
    outcome: JoinHandle<ConductorResult<Run>>,
    _hold: Option<Box<dyn std::any::Any + Send>>,
}

impl TurnStream {
    /// Keep a value alive for the lifetime of this stream
    ///
    /// Used by the session to pin its active-turn guard to the turn.
    pub(crate) fn hold(mut self, value: impl std::any::Any + Send) -> Self {
        self._hold = Some(Box::new(value));
        self
    }

    /// Wait for the driver to finish and return the terminal run
    ///
    /// Any chunks not yet consumed are discarded.
    pub async fn finish(self) -> ConductorResult<Run> {
        let mut chunks = self.chunks.into_inner();
        chunks.close();
        while chunks.recv().await.is_some() {}
        self.outcome
            .await
            .map_err(|err| ConductorError::transport(format!("driver task failed: {err}")))?
    }
}

impl Stream for TurnStream {
    type Item = ConductorResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().chunks).poll_next(cx)
    }
}

impl RunDriver {
    /// Execute one run by consuming its event stream
    ///
    /// Returns immediately with the chunk stream; the driver advances the
    /// run on a background task, resolving required actions between
    /// stream segments. Call [`TurnStream::finish`] for the terminal run.
    pub fn run_streamed(
        &self,
        thread_id: &str,
        agent_id: &str,
        resources: Option<ToolResources>,
    ) -> TurnStream {
        let cancel = self.begin_turn();
        let budget = LocalCallBudget::new(self.config().local_call_limit);
        let (tx, rx) = mpsc::channel(32);

        let driver = self.clone();
        let thread_id = thread_id.to_string();
        let agent_id = agent_id.to_string();
        let outcome = tokio::spawn(async move {
            driver
                .drive_streamed(&thread_id, &agent_id, resources, budget, cancel, tx)
                .await
        });

        TurnStream {
            chunks: ReceiverStream::new(rx),
            outcome,
            _hold: None,
        }
    }

    async fn drive_streamed(
        &self,
        thread_id: &str,
        agent_id: &str,
        resources: Option<ToolResources>,
        budget: LocalCallBudget,
        cancel: CancellationToken,
        tx: mpsc::Sender<ConductorResult<String>>,
    ) -> ConductorResult<Run> {
        let mut stream = self
            .service()
            .create_run_stream(thread_id, agent_id, resources)
            .await?;
        let mut current: Option<Run> = None;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    return match current {
                        Some(run) => self.cancel_backing_run(&run).await,
                        None => Err(ConductorError::Cancelled),
                    };
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(RunUpdate::RunCreated { run })) => {
                    tracing::debug!(run_id = %run.id, thread_id, "run created (streaming)");
                    current = Some(run);
                }
                Some(Ok(RunUpdate::MessageDelta { text })) => {
                    // A dropped receiver just means nobody wants the chunks.
                    let _ = tx.send(Ok(text)).await;
                }
                Some(Ok(RunUpdate::MessageCompleted { .. })) => {}
                Some(Ok(RunUpdate::RunRequiresAction { run })) => {
                    stream = match self.resolve_action(&run, &budget, &cancel).await {
                        Ok(Submission::Outputs(outputs)) => {
                            self.service()
                                .submit_tool_outputs_stream(thread_id, &run.id, outputs)
                                .await?
                        }
                        Ok(Submission::Approvals(approvals)) => {
                            self.service()
                                .submit_tool_approvals_stream(thread_id, &run.id, approvals)
                                .await?
                        }
                        Err(ConductorError::Cancelled) => {
                            return self.cancel_backing_run(&run).await;
                        }
                        Err(err @ ConductorError::ToolCallLimitExceeded { .. }) => {
                            let _ = tx.send(Err(err.clone())).await;
                            return self.fail_run_locally(&run, err).await;
                        }
                        Err(err) => return Err(err),
                    };
                    current = Some(run);
                }
                Some(Ok(RunUpdate::RunCompleted { run })) => {
                    tracing::debug!(run_id = %run.id, "run completed (streaming)");
                    return Ok(run);
                }
                Some(Ok(RunUpdate::RunFailed { run })) => {
                    let error = run
                        .last_error
                        .clone()
                        .unwrap_or_else(|| crate::run::RunError::new("unknown", "run failed"));
                    let _ = tx
                        .send(Err(ConductorError::RunFailed {
                            code: error.code,
                            message: error.message,
                        }))
                        .await;
                    return Ok(run);
                }
                Some(Err(err)) => return Err(err),
                None => {
                    // The service never ends a stream without a terminal
                    // event; treat silence as a lost connection.
                    return Err(ConductorError::transport(
                        "run stream ended before a terminal status",
                    ));
                }
            }
        }
    }
}
