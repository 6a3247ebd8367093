//! Run lifecycle types and update events

use crate::thread::Message;
use crate::tools::types::ToolCall;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a run
///
/// Valid sequences are subsequences of
/// `Queued → InProgress → (RequiresAction → InProgress)* → terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, not yet picked up by the service
    Queued,
    /// The service is producing output
    InProgress,
    /// The service needs tool outputs or approvals before continuing
    RequiresAction,
    /// Finished with a final answer
    Completed,
    /// Finished with an error; see `Run::last_error`
    Failed,
    /// Stopped at the caller's request
    Cancelled,
}

impl RunStatus {
    /// Whether this status ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Terminal error reported for a failed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl RunError {
    /// Create a run error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// What the service needs before the run can continue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequiredAction {
    /// Execute these tool calls and submit their outputs
    SubmitToolOutputs { calls: Vec<ToolCall> },
    /// Approve or reject these remote tool calls
    SubmitToolApprovals { calls: Vec<ToolCall> },
}

impl RequiredAction {
    /// The tool calls attached to this action
    pub fn calls(&self) -> &[ToolCall] {
        match self {
            Self::SubmitToolOutputs { calls } | Self::SubmitToolApprovals { calls } => calls,
        }
    }
}

/// One execution attempt of a conversation against one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Service-assigned run id
    pub id: String,
    /// Owning thread
    pub thread_id: String,
    /// Agent the run executes against
    pub agent_id: String,
    /// Current lifecycle status
    pub status: RunStatus,
    /// Present exactly while `status` is `RequiresAction`
    pub required_action: Option<RequiredAction>,
    /// Present once `status` is `Failed`
    pub last_error: Option<RunError>,
}

impl Run {
    /// Whether the run has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A lifecycle or content event observed while consuming a run
///
/// Within one run the order is fixed: `RunCreated` first, message events
/// next, and exactly one terminal event (`RunCompleted` or `RunFailed`)
/// last unless the consumer stops early.
#[derive(Debug, Clone)]
pub enum RunUpdate {
    /// The run was created and accepted
    RunCreated { run: Run },
    /// An incremental text fragment of the reply being produced
    MessageDelta { text: String },
    /// A full message finished forming
    MessageCompleted { message: Message },
    /// The run paused waiting for tool outputs or approvals
    RunRequiresAction { run: Run },
    /// The run finished successfully
    RunCompleted { run: Run },
    /// The run finished with an error
    RunFailed { run: Run },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::InProgress.is_terminal());
        assert!(!RunStatus::RequiresAction.is_terminal());
    }

    #[test]
    fn required_action_exposes_calls_for_both_kinds() {
        let call = ToolCall::new("call_1", "lookup", Default::default());
        let outputs = RequiredAction::SubmitToolOutputs {
            calls: vec![call.clone()],
        };
        let approvals = RequiredAction::SubmitToolApprovals { calls: vec![call] };
        assert_eq!(outputs.calls().len(), 1);
        assert_eq!(approvals.calls()[0].name, "lookup");
    }
}
