//! Canned turn scripts for the simulated backing service
//!
//! The demo binary runs against [`SimulatedService`]; these scripts stand
//! in for the model's behavior so every orchestration path — tool calls,
//! delegation, remote approvals, streaming deltas — is exercised
//! end to end.

use conductor_core::service::{ScriptedCall, TurnScript};
use conductor_tools::docs::DOCS_SERVER_LABEL;

/// A support turn: call the ticket tool, then confirm with its result
pub fn support_script(prompt: &str) -> TurnScript {
    TurnScript::new()
        .request_tool_outputs(vec![
            ScriptedCall::new("submit_support_ticket")
                .with_argument("emailAddress", serde_json::json!("user@contoso.com"))
                .with_argument("description", serde_json::json!(prompt)),
        ])
        .respond([
            "I've filed a support ticket for your issue. ",
            "{{output.submit_support_ticket}}",
        ])
}

/// A triage turn: the service resolves the three delegates internally
/// and streams back the combined classification
pub fn triage_script() -> TurnScript {
    TurnScript::new().respond([
        "Priority: High — the issue blocks users from signing in on mobile.\n",
        "Team: Frontend — the reset flow lives in the mobile app.\n",
        "Effort: Medium — likely 2-3 days of work.",
    ])
}

/// A docs turn: a remote tool call that must pass the approval gate
pub fn docs_script(question: &str) -> TurnScript {
    TurnScript::new()
        .request_approvals(vec![ScriptedCall::new(DOCS_SERVER_LABEL)])
        .respond(vec![
            format!("Searching the documentation for \"{question}\"... "),
            format!("(remote call {{{{output.{DOCS_SERVER_LABEL}}}}})\n"),
            "Use `az containerapp create` with `--system-assigned` to create ".to_string(),
            "an Azure Container App with a managed identity.".to_string(),
        ])
}
