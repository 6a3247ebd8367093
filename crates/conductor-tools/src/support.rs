//! Support ticket submission tool

use async_trait::async_trait;
use conductor_core::error::{ConductorError, ConductorResult};
use conductor_core::tools::{FunctionTool, ToolCall, ToolParameter, ToolSchema};
use std::path::PathBuf;

/// Instructions for an agent that files support tickets
pub const SUPPORT_AGENT_INSTRUCTIONS: &str = "\
You are a technical support agent.
When a user has a technical issue, you get their email address and a description of the issue.
Then you use those values to submit a support ticket using the function available to you.
If a file is saved, tell the user the file name.";

/// Files a support ticket and writes it to disk
///
/// The ticket file lands in the configured directory as
/// `ticket-<6-hex-chars>.txt`; the returned payload is a JSON message
/// naming the ticket and the file.
pub struct SupportTicketTool {
    output_dir: PathBuf,
}

impl SupportTicketTool {
    /// Create a tool writing tickets into the given directory
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Create a tool writing tickets into the current directory
    pub fn in_current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

#[async_trait]
impl FunctionTool for SupportTicketTool {
    fn name(&self) -> &str {
        "submit_support_ticket"
    }

    fn description(&self) -> &str {
        "Submit a support ticket with an email address and description."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            self.name(),
            self.description(),
            vec![
                ToolParameter::string(
                    "emailAddress",
                    "The email address of the person submitting the ticket.",
                ),
                ToolParameter::string("description", "A description of the issue or request."),
            ],
        )
    }

    async fn execute(&self, call: &ToolCall) -> ConductorResult<String> {
        let email_address = call
            .get_string("emailAddress")
            .ok_or_else(|| ConductorError::invocation(self.name(), "missing 'emailAddress'"))?;
        let description = call
            .get_string("description")
            .ok_or_else(|| ConductorError::invocation(self.name(), "missing 'description'"))?;

        let ticket_number = uuid::Uuid::new_v4().simple().to_string()[..6].to_string();
        let file_name = format!("ticket-{ticket_number}.txt");
        let path = self.output_dir.join(&file_name);
        let text = format!(
            "Support ticket: {ticket_number}\nSubmitted by: {email_address}\nDescription:\n{description}"
        );
        tokio::fs::write(&path, text).await.map_err(|err| {
            ConductorError::invocation(self.name(), format!("failed to write ticket file: {err}"))
        })?;
        tracing::debug!(ticket = %ticket_number, path = %path.display(), "ticket filed");

        Ok(serde_json::json!({
            "message": format!(
                "Support ticket {ticket_number} submitted. The ticket file is saved as {file_name}"
            )
        })
        .to_string())
    }
}
