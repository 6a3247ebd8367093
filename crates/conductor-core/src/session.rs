//! A conversation session bound to one agent

use crate::agent::Agent;
use crate::driver::{RunDriver, TurnStream};
use crate::error::{ConductorError, ConductorResult};
use crate::run::Run;
use crate::service::{AgentService, ToolResources};
use crate::thread::{ListOrder, Message, MessageContent, MessageRole};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clears the session's active flag when the turn ends
struct TurnGuard {
    active: Arc<AtomicBool>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// One conversation against one agent
///
/// Owns the thread for its lifetime and enforces the single-active-run
/// rule: a second submission while a run is in flight is rejected.
pub struct Session {
    service: Arc<dyn AgentService>,
    driver: RunDriver,
    agent: Agent,
    thread_id: String,
    resources: Option<ToolResources>,
    active: Arc<AtomicBool>,
}

impl Session {
    /// Open a session: creates a fresh thread for the agent
    pub async fn open(
        service: Arc<dyn AgentService>,
        driver: RunDriver,
        agent: Agent,
    ) -> ConductorResult<Self> {
        let thread_id = service.create_thread().await?;
        tracing::debug!(thread_id, agent = %agent.name, "session opened");
        Ok(Self {
            service,
            driver,
            agent,
            thread_id,
            resources: None,
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Attach per-run tool resources (remote headers, uploaded files)
    pub fn with_resources(mut self, resources: ToolResources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// The owned thread id
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// The agent this session runs against
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// The driver, for cancellation and gate access
    pub fn driver(&self) -> &RunDriver {
        &self.driver
    }

    /// Submit a user prompt and drive the run to a terminal status by polling
    pub async fn submit(&self, prompt: &str) -> ConductorResult<Run> {
        let guard = self.begin_turn()?;
        self.post_prompt(prompt).await?;
        let run = self
            .driver
            .run_polled(&self.thread_id, &self.agent.id, self.resources.clone())
            .await;
        drop(guard);
        run
    }

    /// Submit a user prompt and consume the reply as a chunk stream
    pub async fn submit_streaming(&self, prompt: &str) -> ConductorResult<TurnStream> {
        let guard = self.begin_turn()?;
        self.post_prompt(prompt).await?;
        let stream =
            self.driver
                .run_streamed(&self.thread_id, &self.agent.id, self.resources.clone());
        // The guard travels with the stream: the turn slot frees when the
        // caller finishes (or drops) it.
        Ok(stream.hold(guard))
    }

    /// The conversation so far, oldest first
    pub async fn conversation(&self) -> ConductorResult<Vec<Message>> {
        self.service
            .list_messages(&self.thread_id, ListOrder::Ascending)
            .await
    }

    /// The text of the most recent agent reply, if any
    pub async fn last_reply(&self) -> ConductorResult<Option<String>> {
        let messages = self
            .service
            .list_messages(&self.thread_id, ListOrder::Descending)
            .await?;
        Ok(messages
            .into_iter()
            .find(|message| message.role == MessageRole::Agent)
            .map(|message| message.text_content()))
    }

    /// Request cancellation of the turn in flight
    pub fn cancel(&self) {
        self.driver.cancel();
    }

    /// Close the session, deleting the thread
    pub async fn close(self) -> ConductorResult<()> {
        self.service.delete_thread(&self.thread_id).await
    }

    fn begin_turn(&self) -> ConductorResult<TurnGuard> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ConductorError::invalid_state(
                "a run is already active for this conversation",
            ));
        }
        Ok(TurnGuard {
            active: self.active.clone(),
        })
    }

    async fn post_prompt(&self, prompt: &str) -> ConductorResult<()> {
        self.service
            .post_message(
                &self.thread_id,
                MessageRole::User,
                vec![MessageContent::text(prompt)],
            )
            .await?;
        Ok(())
    }
}
