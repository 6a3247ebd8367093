//! Scenario tests mirroring the demo flows end to end

use conductor_core::agent::{AgentDefinition, AgentRoster};
use conductor_core::driver::{RunDriver, RunDriverConfig};
use conductor_core::run::RunStatus;
use conductor_core::service::{AgentService, ScriptedCall, SimulatedService, TurnScript};
use conductor_core::session::Session;
use conductor_core::tools::{ApprovalGate, ApprovalPolicy, ToolCatalog};
use conductor_tools::build_triage_team;
use conductor_tools::support::{SUPPORT_AGENT_INSTRUCTIONS, SupportTicketTool};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> RunDriverConfig {
    RunDriverConfig {
        poll_interval: Duration::from_millis(2),
        transport_backoff: Duration::from_millis(1),
        ..RunDriverConfig::default()
    }
}

#[tokio::test]
async fn a_ticket_is_triaged_into_three_classifications() {
    let service = SimulatedService::new();
    let roster = AgentRoster::new();
    let mut catalog = ToolCatalog::new();

    let triage_agent = build_triage_team(&service, &roster, &mut catalog)
        .await
        .unwrap();

    let driver = RunDriver::with_config(
        Arc::new(service.clone()),
        Arc::new(catalog),
        Arc::new(ApprovalGate::new(ApprovalPolicy::Manual)),
        fast_config(),
    );
    let session = Session::open(Arc::new(service.clone()), driver, triage_agent)
        .await
        .unwrap();

    // The service resolves the three delegates internally and streams the
    // combined classification back.
    service.enqueue_script(
        session.thread_id(),
        TurnScript::new().respond([
            "Priority: High — the issue blocks users from signing in on mobile.\n",
            "Team: Frontend — the reset flow lives in the mobile app.\n",
            "Effort: Medium — likely 2-3 days of work.",
        ]),
    );

    let run = session
        .submit("Users can't reset their password from the mobile app.")
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    let reply = session.last_reply().await.unwrap().unwrap();
    assert!(reply.contains("Priority: High"));
    assert!(reply.contains("Team: Frontend"));
    assert!(reply.contains("Effort: Medium"));
}

#[tokio::test]
async fn a_support_turn_files_a_ticket_and_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let service = SimulatedService::new();
    let roster = AgentRoster::new();

    let mut catalog = ToolCatalog::new();
    catalog
        .register_function(Arc::new(SupportTicketTool::new(dir.path())))
        .unwrap();

    let mut definition = AgentDefinition::new("support-agent", SUPPORT_AGENT_INSTRUCTIONS);
    definition.tools = catalog.declarations();
    let agent = service.create_agent(definition).await.unwrap();
    roster.admit(&agent).unwrap();

    let driver = RunDriver::with_config(
        Arc::new(service.clone()),
        Arc::new(catalog),
        Arc::new(ApprovalGate::new(ApprovalPolicy::Manual)),
        fast_config(),
    );
    let session = Session::open(Arc::new(service.clone()), driver, agent)
        .await
        .unwrap();

    service.enqueue_script(
        session.thread_id(),
        TurnScript::new()
            .request_tool_outputs(vec![
                ScriptedCall::new("submit_support_ticket")
                    .with_argument("emailAddress", serde_json::json!("a@b.com"))
                    .with_argument("description", serde_json::json!("x")),
            ])
            .respond(["{{output.submit_support_ticket}}"]),
    );

    let run = session.submit("My login is broken, email a@b.com").await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    let reply = session.last_reply().await.unwrap().unwrap();
    assert!(reply.contains("Support ticket"));
    assert!(reply.contains("ticket-"));
    assert!(reply.contains(".txt"));

    // Exactly one ticket file with the expected name shape.
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names.len(), 1);
    let hex = &names[0]["ticket-".len()..names[0].len() - ".txt".len()];
    assert_eq!(hex.len(), 6);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(reply.contains(&names[0]));
}
