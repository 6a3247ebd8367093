//! The narrow seam to the backing agent service

pub mod sim;

use crate::agent::{Agent, AgentDefinition};
use crate::error::ConductorResult;
use crate::run::{Run, RunUpdate};
use crate::thread::{ListOrder, Message, MessageContent, MessageRole};
use crate::tools::{ApprovalRequest, ToolOutput};
use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

pub use sim::{ScriptedCall, SimulatedService, TurnScript};

/// Ordered sequence of run lifecycle and content events
pub type RunUpdateStream = Pin<Box<dyn Stream<Item = ConductorResult<RunUpdate>> + Send>>;

/// Whether the service must surface approval requests for remote tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequireApproval {
    /// Every remote call pauses the run for an approval decision
    #[default]
    Always,
    /// The service proceeds without surfacing approvals
    Never,
}

/// Per-run resources for remote toolsets and uploaded files
#[derive(Debug, Clone, Default)]
pub struct ToolResources {
    /// Remote tool server settings for this run
    pub remote: Option<RemoteToolResource>,
    /// Uploaded file ids attached to the run
    pub file_ids: Vec<String>,
}

/// Remote tool server settings attached to a run
#[derive(Debug, Clone)]
pub struct RemoteToolResource {
    /// Label of the tool server these settings apply to
    pub server_label: String,
    /// Headers forwarded with remote calls
    pub headers: HashMap<String, String>,
    /// Approval mode for this run
    pub require_approval: RequireApproval,
}

impl ToolResources {
    /// Attach remote tool server settings
    pub fn with_remote(
        mut self,
        server_label: impl Into<String>,
        headers: HashMap<String, String>,
        require_approval: RequireApproval,
    ) -> Self {
        self.remote = Some(RemoteToolResource {
            server_label: server_label.into(),
            headers,
            require_approval,
        });
        self
    }

    /// Attach an uploaded file
    pub fn with_file(mut self, file_id: impl Into<String>) -> Self {
        self.file_ids.push(file_id.into());
        self
    }
}

/// The backing agent service, consumed as an opaque collaborator
///
/// Everything the orchestration core needs from the remote side: agent and
/// thread lifecycle, run creation and advancement in both consumption
/// modes, and artifact upload. Implementations own transport, retries at
/// the wire level, and persistence.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Create an agent from a definition
    async fn create_agent(&self, definition: AgentDefinition) -> ConductorResult<Agent>;

    /// Delete an agent
    async fn delete_agent(&self, agent_id: &str) -> ConductorResult<()>;

    /// Create a conversation thread
    async fn create_thread(&self) -> ConductorResult<String>;

    /// Delete a thread and its messages
    async fn delete_thread(&self, thread_id: &str) -> ConductorResult<()>;

    /// Append a message to a thread
    async fn post_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: Vec<MessageContent>,
    ) -> ConductorResult<Message>;

    /// Create a run of a thread against an agent
    async fn create_run(
        &self,
        thread_id: &str,
        agent_id: &str,
        resources: Option<ToolResources>,
    ) -> ConductorResult<Run>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> ConductorResult<Run>;

    /// Best-effort cancellation of a non-terminal run
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> ConductorResult<Run>;

    /// Create a run and consume it as an event stream
    async fn create_run_stream(
        &self,
        thread_id: &str,
        agent_id: &str,
        resources: Option<ToolResources>,
    ) -> ConductorResult<RunUpdateStream>;

    /// Submit tool outputs for a run waiting in `RequiresAction`
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> ConductorResult<Run>;

    /// Submit tool outputs and continue consuming the run as a stream
    async fn submit_tool_outputs_stream(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> ConductorResult<RunUpdateStream>;

    /// Submit approval decisions for a run waiting in `RequiresAction`
    async fn submit_tool_approvals(
        &self,
        thread_id: &str,
        run_id: &str,
        approvals: Vec<ApprovalRequest>,
    ) -> ConductorResult<Run>;

    /// Submit approval decisions and continue consuming the run as a stream
    async fn submit_tool_approvals_stream(
        &self,
        thread_id: &str,
        run_id: &str,
        approvals: Vec<ApprovalRequest>,
    ) -> ConductorResult<RunUpdateStream>;

    /// List the messages of a thread
    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
    ) -> ConductorResult<Vec<Message>>;

    /// Upload an artifact, returning its file id
    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> ConductorResult<String>;

    /// Fetch the content of an uploaded artifact
    async fn get_file_content(&self, file_id: &str) -> ConductorResult<Vec<u8>>;
}
