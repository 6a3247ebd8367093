//! In-process simulated agent service
//!
//! A deterministic stand-in for the remote service: run behavior is driven
//! by per-turn scripts, so the same scenario can be consumed through
//! polling and streaming and observed to take identical transitions. Used
//! by the integration tests and the demo CLI; real deployments supply
//! their own [`AgentService`] implementation.

use crate::agent::{Agent, AgentDefinition};
use crate::error::{ConductorError, ConductorResult};
use crate::run::{RequiredAction, Run, RunError, RunStatus, RunUpdate};
use crate::service::{AgentService, RequireApproval, RunUpdateStream, ToolResources};
use crate::thread::{ListOrder, Message, MessageContent, MessageRole};
use crate::tools::{ApprovalRequest, ToolCall, ToolOutput};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A tool call the script asks the consumer to resolve
#[derive(Debug, Clone)]
pub struct ScriptedCall {
    /// Tool name
    pub name: String,
    /// Call arguments
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ScriptedCall {
    /// Create a call with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
        }
    }

    /// Add an argument
    pub fn with_argument(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone)]
enum ScriptStep {
    RequestToolOutputs(Vec<ScriptedCall>),
    RequestApprovals(Vec<ScriptedCall>),
    Respond(Vec<String>),
    Fail { code: String, message: String },
}

/// Scripted behavior of one run
///
/// Steps play in order; `Respond` chunks accumulate into the single agent
/// reply of the turn and may reference submitted tool payloads as
/// `{{output.<tool_name>}}`.
#[derive(Debug, Clone, Default)]
pub struct TurnScript {
    steps: VecDeque<ScriptStep>,
}

impl TurnScript {
    /// Create an empty script (completes immediately with an empty reply)
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause the run until tool outputs for these calls are submitted
    pub fn request_tool_outputs(mut self, calls: Vec<ScriptedCall>) -> Self {
        self.steps.push_back(ScriptStep::RequestToolOutputs(calls));
        self
    }

    /// Pause the run until approval decisions for these calls are submitted
    pub fn request_approvals(mut self, calls: Vec<ScriptedCall>) -> Self {
        self.steps.push_back(ScriptStep::RequestApprovals(calls));
        self
    }

    /// Emit reply text as individual deltas
    pub fn respond<S: Into<String>>(mut self, chunks: impl IntoIterator<Item = S>) -> Self {
        self.steps.push_back(ScriptStep::Respond(
            chunks.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// End the run with a terminal failure
    pub fn fail(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.steps.push_back(ScriptStep::Fail {
            code: code.into(),
            message: message.into(),
        });
        self
    }
}

#[derive(Debug)]
struct RunState {
    run: Run,
    resources: Option<ToolResources>,
    steps: VecDeque<ScriptStep>,
    pending_call_ids: Vec<String>,
    outputs: HashMap<String, String>,
    reply: String,
}

#[derive(Debug, Default)]
struct ThreadState {
    messages: Vec<Message>,
    scripts: VecDeque<TurnScript>,
    active_run: Option<String>,
}

#[derive(Default)]
struct SimState {
    agents: HashMap<String, Agent>,
    threads: HashMap<String, ThreadState>,
    runs: HashMap<String, RunState>,
    files: HashMap<String, (String, Vec<u8>)>,
    get_run_faults: u32,
    truncate_next_stream: bool,
}

/// The simulated service; cheap to clone, state is shared
#[derive(Clone, Default)]
pub struct SimulatedService {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedService {
    /// Create an empty simulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the script for the next run created on a thread
    pub fn enqueue_script(&self, thread_id: &str, script: TurnScript) {
        let mut state = self.state.lock();
        if let Some(thread) = state.threads.get_mut(thread_id) {
            thread.scripts.push_back(script);
        }
    }

    /// Make the next `n` `get_run` calls fail with a transport error
    pub fn inject_get_run_faults(&self, n: u32) {
        self.state.lock().get_run_faults = n;
    }

    /// Drop the final event of the next stream, simulating a lost connection
    pub fn truncate_next_stream(&self) {
        self.state.lock().truncate_next_stream = true;
    }
}

fn short_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &id[..8])
}

fn materialize(calls: Vec<ScriptedCall>) -> Vec<ToolCall> {
    calls
        .into_iter()
        .map(|call| ToolCall::new(short_id("call"), call.name, call.arguments))
        .collect()
}

fn substitute(text: &str, outputs: &HashMap<String, String>) -> String {
    let mut result = text.to_string();
    for (name, payload) in outputs {
        result = result.replace(&format!("{{{{output.{name}}}}}"), payload);
    }
    result
}

impl SimState {
    fn thread_mut(&mut self, thread_id: &str) -> ConductorResult<&mut ThreadState> {
        self.threads
            .get_mut(thread_id)
            .ok_or_else(|| ConductorError::invalid_state(format!("unknown thread '{thread_id}'")))
    }

    fn run_mut(&mut self, run_id: &str) -> ConductorResult<&mut RunState> {
        self.runs
            .get_mut(run_id)
            .ok_or_else(|| ConductorError::invalid_state(format!("unknown run '{run_id}'")))
    }

    /// Play script steps until the run pauses or terminates
    fn advance(&mut self, run_id: &str) -> ConductorResult<Vec<RunUpdate>> {
        let mut updates = Vec::new();
        loop {
            let state = self.run_mut(run_id)?;
            match state.steps.pop_front() {
                Some(ScriptStep::Respond(chunks)) => {
                    for chunk in chunks {
                        let text = substitute(&chunk, &state.outputs);
                        state.reply.push_str(&text);
                        updates.push(RunUpdate::MessageDelta { text });
                    }
                }
                Some(ScriptStep::RequestToolOutputs(calls)) => {
                    let calls = materialize(calls);
                    state.pending_call_ids = calls.iter().map(|call| call.id.clone()).collect();
                    state.run.status = RunStatus::RequiresAction;
                    state.run.required_action = Some(RequiredAction::SubmitToolOutputs { calls });
                    updates.push(RunUpdate::RunRequiresAction {
                        run: state.run.clone(),
                    });
                    return Ok(updates);
                }
                Some(ScriptStep::RequestApprovals(calls)) => {
                    let auto = matches!(
                        state.resources.as_ref().and_then(|r| r.remote.as_ref()),
                        Some(remote) if remote.require_approval == RequireApproval::Never
                    );
                    if auto {
                        // Approval mode "never": the service proceeds on its own.
                        for call in &calls {
                            state.outputs.insert(call.name.clone(), "approved".into());
                        }
                        continue;
                    }
                    let calls = materialize(calls);
                    state.pending_call_ids = calls.iter().map(|call| call.id.clone()).collect();
                    state.run.status = RunStatus::RequiresAction;
                    state.run.required_action = Some(RequiredAction::SubmitToolApprovals { calls });
                    updates.push(RunUpdate::RunRequiresAction {
                        run: state.run.clone(),
                    });
                    return Ok(updates);
                }
                Some(ScriptStep::Fail { code, message }) => {
                    state.run.status = RunStatus::Failed;
                    state.run.last_error = Some(RunError::new(code, message));
                    let run = state.run.clone();
                    let thread_id = run.thread_id.clone();
                    self.thread_mut(&thread_id)?.active_run = None;
                    updates.push(RunUpdate::RunFailed { run });
                    return Ok(updates);
                }
                None => {
                    state.run.status = RunStatus::Completed;
                    let reply = std::mem::take(&mut state.reply);
                    let run = state.run.clone();
                    let message = Message::text(MessageRole::Agent, reply);
                    let thread = self.thread_mut(&run.thread_id)?;
                    thread.messages.push(message.clone());
                    thread.active_run = None;
                    updates.push(RunUpdate::MessageCompleted { message });
                    updates.push(RunUpdate::RunCompleted { run });
                    return Ok(updates);
                }
            }
        }
    }

    fn start_run(
        &mut self,
        thread_id: &str,
        agent_id: &str,
        resources: Option<ToolResources>,
    ) -> ConductorResult<Run> {
        if !self.agents.contains_key(agent_id) {
            return Err(ConductorError::invalid_state(format!(
                "unknown agent '{agent_id}'"
            )));
        }
        let thread = self.thread_mut(thread_id)?;
        if let Some(active) = &thread.active_run {
            return Err(ConductorError::invalid_state(format!(
                "thread '{thread_id}' already has an active run '{active}'"
            )));
        }
        let script = thread.scripts.pop_front().unwrap_or_else(|| {
            TurnScript::new().respond(["I have no scripted behavior for this turn."])
        });
        let run = Run {
            id: short_id("run"),
            thread_id: thread_id.to_string(),
            agent_id: agent_id.to_string(),
            status: RunStatus::Queued,
            required_action: None,
            last_error: None,
        };
        thread.active_run = Some(run.id.clone());
        self.runs.insert(
            run.id.clone(),
            RunState {
                run: run.clone(),
                resources,
                steps: script.steps,
                pending_call_ids: Vec::new(),
                outputs: HashMap::new(),
                reply: String::new(),
            },
        );
        Ok(run)
    }

    /// Validate and apply a tool-output submission; rejects replays
    fn apply_outputs(&mut self, run_id: &str, outputs: Vec<ToolOutput>) -> ConductorResult<()> {
        let state = self.run_mut(run_id)?;
        let calls = match (&state.run.status, &state.run.required_action) {
            (RunStatus::RequiresAction, Some(RequiredAction::SubmitToolOutputs { calls })) => {
                calls.clone()
            }
            _ => {
                return Err(ConductorError::invalid_state(format!(
                    "run '{run_id}' is not waiting for tool outputs"
                )));
            }
        };
        for output in &outputs {
            if !state.pending_call_ids.contains(&output.call_id) {
                return Err(ConductorError::invalid_state(format!(
                    "output references unknown call '{}'",
                    output.call_id
                )));
            }
        }
        for output in outputs {
            if let Some(call) = calls.iter().find(|call| call.id == output.call_id) {
                state
                    .outputs
                    .insert(call.name.clone(), output.payload().to_string());
            }
        }
        state.pending_call_ids.clear();
        state.run.required_action = None;
        state.run.status = RunStatus::InProgress;
        Ok(())
    }

    /// Validate and apply an approval submission; rejects replays
    fn apply_approvals(
        &mut self,
        run_id: &str,
        approvals: Vec<ApprovalRequest>,
    ) -> ConductorResult<()> {
        let state = self.run_mut(run_id)?;
        let waiting = matches!(
            (&state.run.status, &state.run.required_action),
            (
                RunStatus::RequiresAction,
                Some(RequiredAction::SubmitToolApprovals { .. })
            )
        );
        if !waiting {
            return Err(ConductorError::invalid_state(format!(
                "run '{run_id}' is not waiting for tool approvals"
            )));
        }
        for approval in &approvals {
            if !state.pending_call_ids.contains(&approval.call_id) {
                return Err(ConductorError::invalid_state(format!(
                    "approval references unknown call '{}'",
                    approval.call_id
                )));
            }
            if !approval.is_resolved() {
                return Err(ConductorError::invalid_state(format!(
                    "approval for call '{}' carries no decision",
                    approval.call_id
                )));
            }
        }
        for approval in approvals {
            let verdict = if approval.is_approved() {
                "approved"
            } else {
                "rejected"
            };
            state
                .outputs
                .insert(approval.tool_name.clone(), verdict.to_string());
        }
        state.pending_call_ids.clear();
        state.run.required_action = None;
        state.run.status = RunStatus::InProgress;
        Ok(())
    }

    fn make_stream(&mut self, mut updates: Vec<RunUpdate>) -> RunUpdateStream {
        if self.truncate_next_stream {
            self.truncate_next_stream = false;
            updates.pop();
        }
        Box::pin(futures::stream::iter(
            updates.into_iter().map(Ok::<_, ConductorError>),
        ))
    }
}

#[async_trait]
impl AgentService for SimulatedService {
    async fn create_agent(&self, definition: AgentDefinition) -> ConductorResult<Agent> {
        let agent = Agent {
            id: short_id("agent"),
            name: definition.name,
            instructions: definition.instructions,
            tools: definition.tools,
        };
        self.state
            .lock()
            .agents
            .insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    async fn delete_agent(&self, agent_id: &str) -> ConductorResult<()> {
        self.state
            .lock()
            .agents
            .remove(agent_id)
            .map(|_| ())
            .ok_or_else(|| ConductorError::invalid_state(format!("unknown agent '{agent_id}'")))
    }

    async fn create_thread(&self) -> ConductorResult<String> {
        let thread_id = short_id("thread");
        self.state
            .lock()
            .threads
            .insert(thread_id.clone(), ThreadState::default());
        Ok(thread_id)
    }

    async fn delete_thread(&self, thread_id: &str) -> ConductorResult<()> {
        self.state
            .lock()
            .threads
            .remove(thread_id)
            .map(|_| ())
            .ok_or_else(|| ConductorError::invalid_state(format!("unknown thread '{thread_id}'")))
    }

    async fn post_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: Vec<MessageContent>,
    ) -> ConductorResult<Message> {
        let mut state = self.state.lock();
        let thread = state.thread_mut(thread_id)?;
        let message = Message {
            id: short_id("msg"),
            role,
            content,
            created_at: chrono::Utc::now(),
        };
        thread.messages.push(message.clone());
        Ok(message)
    }

    async fn create_run(
        &self,
        thread_id: &str,
        agent_id: &str,
        resources: Option<ToolResources>,
    ) -> ConductorResult<Run> {
        self.state.lock().start_run(thread_id, agent_id, resources)
    }

    async fn get_run(&self, _thread_id: &str, run_id: &str) -> ConductorResult<Run> {
        let mut state = self.state.lock();
        if state.get_run_faults > 0 {
            state.get_run_faults -= 1;
            return Err(ConductorError::transport("connection reset by peer"));
        }
        let status = state.run_mut(run_id)?.run.status;
        match status {
            RunStatus::Queued => {
                let run = &mut state.run_mut(run_id)?.run;
                run.status = RunStatus::InProgress;
                Ok(run.clone())
            }
            RunStatus::InProgress => {
                state.advance(run_id)?;
                Ok(state.run_mut(run_id)?.run.clone())
            }
            _ => Ok(state.run_mut(run_id)?.run.clone()),
        }
    }

    async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> ConductorResult<Run> {
        let mut state = self.state.lock();
        let run_state = state.run_mut(run_id)?;
        if !run_state.run.is_terminal() {
            run_state.run.status = RunStatus::Cancelled;
            run_state.run.required_action = None;
            run_state.steps.clear();
            run_state.pending_call_ids.clear();
            let thread_id = run_state.run.thread_id.clone();
            state.thread_mut(&thread_id)?.active_run = None;
        }
        Ok(state.run_mut(run_id)?.run.clone())
    }

    async fn create_run_stream(
        &self,
        thread_id: &str,
        agent_id: &str,
        resources: Option<ToolResources>,
    ) -> ConductorResult<RunUpdateStream> {
        let mut state = self.state.lock();
        let run = state.start_run(thread_id, agent_id, resources)?;
        let run_id = run.id.clone();
        let mut updates = vec![RunUpdate::RunCreated { run }];
        state.run_mut(&run_id)?.run.status = RunStatus::InProgress;
        updates.extend(state.advance(&run_id)?);
        Ok(state.make_stream(updates))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> ConductorResult<Run> {
        let mut state = self.state.lock();
        state.apply_outputs(run_id, outputs)?;
        Ok(state.run_mut(run_id)?.run.clone())
    }

    async fn submit_tool_outputs_stream(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> ConductorResult<RunUpdateStream> {
        let mut state = self.state.lock();
        state.apply_outputs(run_id, outputs)?;
        let updates = state.advance(run_id)?;
        Ok(state.make_stream(updates))
    }

    async fn submit_tool_approvals(
        &self,
        _thread_id: &str,
        run_id: &str,
        approvals: Vec<ApprovalRequest>,
    ) -> ConductorResult<Run> {
        let mut state = self.state.lock();
        state.apply_approvals(run_id, approvals)?;
        Ok(state.run_mut(run_id)?.run.clone())
    }

    async fn submit_tool_approvals_stream(
        &self,
        _thread_id: &str,
        run_id: &str,
        approvals: Vec<ApprovalRequest>,
    ) -> ConductorResult<RunUpdateStream> {
        let mut state = self.state.lock();
        state.apply_approvals(run_id, approvals)?;
        let updates = state.advance(run_id)?;
        Ok(state.make_stream(updates))
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
    ) -> ConductorResult<Vec<Message>> {
        let mut state = self.state.lock();
        let mut messages = state.thread_mut(thread_id)?.messages.clone();
        if order == ListOrder::Descending {
            messages.reverse();
        }
        Ok(messages)
    }

    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> ConductorResult<String> {
        let file_id = short_id("file");
        self.state
            .lock()
            .files
            .insert(file_id.clone(), (name.to_string(), bytes));
        Ok(file_id)
    }

    async fn get_file_content(&self, file_id: &str) -> ConductorResult<Vec<u8>> {
        self.state
            .lock()
            .files
            .get(file_id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| ConductorError::invalid_state(format!("unknown file '{file_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn seeded() -> (SimulatedService, String, String) {
        let service = SimulatedService::new();
        let agent = service
            .create_agent(AgentDefinition::new("helper", "Be helpful."))
            .await
            .unwrap();
        let thread_id = service.create_thread().await.unwrap();
        (service, thread_id, agent.id)
    }

    #[tokio::test]
    async fn a_plain_turn_completes_with_the_scripted_reply() {
        let (service, thread_id, agent_id) = seeded().await;
        service.enqueue_script(&thread_id, TurnScript::new().respond(["hi ", "there"]));

        let run = service.create_run(&thread_id, &agent_id, None).await.unwrap();
        assert_eq!(run.status, RunStatus::Queued);

        let run = service.get_run(&thread_id, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        let run = service.get_run(&thread_id, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);

        let messages = service
            .list_messages(&thread_id, ListOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text_content(), "hi there");
    }

    #[tokio::test]
    async fn tool_output_replay_is_rejected() {
        let (service, thread_id, agent_id) = seeded().await;
        service.enqueue_script(
            &thread_id,
            TurnScript::new()
                .request_tool_outputs(vec![ScriptedCall::new("lookup")])
                .respond(["got {{output.lookup}}"]),
        );

        let run = service.create_run(&thread_id, &agent_id, None).await.unwrap();
        service.get_run(&thread_id, &run.id).await.unwrap();
        let run = service.get_run(&thread_id, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::RequiresAction);

        let call_id = run.required_action.as_ref().unwrap().calls()[0].id.clone();
        let outputs = vec![ToolOutput::success(&call_id, "42")];
        let run = service
            .submit_tool_outputs(&thread_id, &run.id, outputs.clone())
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::InProgress);

        // Submitting the same batch again must be rejected.
        let err = service
            .submit_tool_outputs(&thread_id, &run.id, outputs)
            .await
            .unwrap_err();
        assert!(matches!(err, ConductorError::InvalidState { .. }));

        let run = service.get_run(&thread_id, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        let messages = service
            .list_messages(&thread_id, ListOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(messages[0].text_content(), "got 42");
    }

    #[tokio::test]
    async fn streaming_yields_ordered_updates() {
        let (service, thread_id, agent_id) = seeded().await;
        service.enqueue_script(&thread_id, TurnScript::new().respond(["a", "b"]));

        let mut stream = service
            .create_run_stream(&thread_id, &agent_id, None)
            .await
            .unwrap();
        let mut kinds = Vec::new();
        while let Some(update) = stream.next().await {
            kinds.push(match update.unwrap() {
                RunUpdate::RunCreated { .. } => "created",
                RunUpdate::MessageDelta { .. } => "delta",
                RunUpdate::MessageCompleted { .. } => "message",
                RunUpdate::RunRequiresAction { .. } => "action",
                RunUpdate::RunCompleted { .. } => "completed",
                RunUpdate::RunFailed { .. } => "failed",
            });
        }
        assert_eq!(kinds, ["created", "delta", "delta", "message", "completed"]);
    }

    #[tokio::test]
    async fn approval_mode_never_skips_the_pause() {
        let (service, thread_id, agent_id) = seeded().await;
        service.enqueue_script(
            &thread_id,
            TurnScript::new()
                .request_approvals(vec![ScriptedCall::new("docs")])
                .respond(["docs were {{output.docs}}"]),
        );
        let resources = ToolResources::default().with_remote(
            "docs",
            HashMap::new(),
            RequireApproval::Never,
        );

        let run = service
            .create_run(&thread_id, &agent_id, Some(resources))
            .await
            .unwrap();
        service.get_run(&thread_id, &run.id).await.unwrap();
        let run = service.get_run(&thread_id, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);

        let messages = service
            .list_messages(&thread_id, ListOrder::Ascending)
            .await
            .unwrap();
        assert_eq!(messages[0].text_content(), "docs were approved");
    }

    #[tokio::test]
    async fn a_second_concurrent_run_is_rejected() {
        let (service, thread_id, agent_id) = seeded().await;
        service.enqueue_script(
            &thread_id,
            TurnScript::new().request_tool_outputs(vec![ScriptedCall::new("lookup")]),
        );
        let run = service.create_run(&thread_id, &agent_id, None).await.unwrap();
        let err = service
            .create_run(&thread_id, &agent_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConductorError::InvalidState { .. }));

        // Cancelling the active run frees the thread.
        let cancelled = service.cancel_run(&thread_id, &run.id).await.unwrap();
        assert_eq!(cancelled.status, RunStatus::Cancelled);
        service.create_run(&thread_id, &agent_id, None).await.unwrap();
    }

    #[tokio::test]
    async fn injected_faults_surface_as_transport_errors() {
        let (service, thread_id, agent_id) = seeded().await;
        let run = service.create_run(&thread_id, &agent_id, None).await.unwrap();
        service.inject_get_run_faults(1);
        let err = service.get_run(&thread_id, &run.id).await.unwrap_err();
        assert!(err.is_retryable());
        service.get_run(&thread_id, &run.id).await.unwrap();
    }

    #[tokio::test]
    async fn uploaded_files_round_trip() {
        let (service, _, _) = seeded().await;
        let file_id = service
            .upload_file("data.txt", b"1,2,3".to_vec())
            .await
            .unwrap();
        let bytes = service.get_file_content(&file_id).await.unwrap();
        assert_eq!(bytes, b"1,2,3");
    }
}
