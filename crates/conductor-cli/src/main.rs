//! Conductor CLI
//!
//! Demonstrates the orchestration core against the in-process simulated
//! service: an interactive support-agent chat, a single-shot triage run
//! through connected sub-agents, and a single-shot docs question answered
//! through an approval-gated remote toolset.
//!
//! Configuration comes from the environment (`CONDUCTOR_PROJECT_ENDPOINT`,
//! `CONDUCTOR_MODEL_DEPLOYMENT`); both must be set before anything runs.

mod args;
mod console;
mod demo;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use conductor_core::agent::{AgentDefinition, AgentRoster};
use conductor_core::config::ServiceConfig;
use conductor_core::driver::RunDriver;
use conductor_core::run::RunStatus;
use conductor_core::service::{AgentService, RequireApproval, SimulatedService, ToolResources};
use conductor_core::session::Session;
use conductor_core::tools::{ApprovalGate, ApprovalPolicy, ToolCatalog};
use conductor_tools::docs::{DOCS_AGENT_INSTRUCTIONS, DOCS_SERVER_LABEL, docs_headers};
use conductor_tools::support::{SUPPORT_AGENT_INSTRUCTIONS, SupportTicketTool};
use conductor_tools::{build_triage_team, docs_toolset};
use std::sync::Arc;

const DEFAULT_TRIAGE_PROMPT: &str = "Users can't reset their password from the mobile app.";
const DEFAULT_DOCS_QUESTION: &str =
    "Give me the Azure CLI commands to create an Azure Container App with a managed identity.";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Fatal before any side effect: nothing is created without config.
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Please set the following environment variables:");
            eprintln!("  {}", conductor_core::config::ENDPOINT_VAR);
            eprintln!("  {}", conductor_core::config::DEPLOYMENT_VAR);
            std::process::exit(1);
        }
    };
    tracing::debug!(endpoint = %config.endpoint, deployment = %config.model_deployment, "configured");

    let command = cli.command.unwrap_or(Commands::Chat);
    match run_command(command).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

async fn run_command(command: Commands) -> Result<i32> {
    match command {
        Commands::Chat => chat().await,
        Commands::Triage { prompt } => {
            triage(&prompt.unwrap_or_else(|| DEFAULT_TRIAGE_PROMPT.to_string())).await
        }
        Commands::Docs { question } => {
            docs(&question.unwrap_or_else(|| DEFAULT_DOCS_QUESTION.to_string())).await
        }
    }
}

/// Interactive chat with a ticket-filing support agent
async fn chat() -> Result<i32> {
    let service = SimulatedService::new();
    let roster = AgentRoster::new();

    let mut catalog = ToolCatalog::new();
    let ticket_tool = Arc::new(SupportTicketTool::in_current_dir());
    catalog.register_function(ticket_tool)?;

    let mut definition = AgentDefinition::new("support-agent", SUPPORT_AGENT_INSTRUCTIONS);
    definition.tools = catalog.declarations();
    let agent = service.create_agent(definition).await?;
    roster.admit(&agent)?;

    let driver = RunDriver::new(
        Arc::new(service.clone()),
        Arc::new(catalog),
        Arc::new(ApprovalGate::new(ApprovalPolicy::Manual)),
    );
    let session = Session::open(Arc::new(service.clone()), driver, agent.clone()).await?;
    println!("You are chatting with: {} ({})", agent.name, agent.id);

    while let Some(prompt) = console::read_prompt() {
        service.enqueue_script(session.thread_id(), demo::support_script(&prompt));
        if let Err(err) = console::stream_turn(&session, &prompt).await {
            // Per-turn failures don't end the conversation.
            println!("Run failure: {err}");
        }
    }

    session.close().await?;
    service.delete_agent(&agent.id).await?;
    Ok(0)
}

/// Single-shot triage through connected sub-agents
async fn triage(prompt: &str) -> Result<i32> {
    let service = SimulatedService::new();
    let roster = AgentRoster::new();
    let mut catalog = ToolCatalog::new();

    let triage_agent = build_triage_team(&service, &roster, &mut catalog).await?;
    println!("Processing agent thread. Please wait.");

    let driver = RunDriver::new(
        Arc::new(service.clone()),
        Arc::new(catalog),
        Arc::new(ApprovalGate::new(ApprovalPolicy::Manual)),
    );
    let session = Session::open(Arc::new(service.clone()), driver, triage_agent.clone()).await?;
    service.enqueue_script(session.thread_id(), demo::triage_script());

    let run = console::stream_turn(&session, prompt).await?;
    let code = console::report_outcome(&run);

    session.close().await?;
    for agent_id in roster.ids() {
        service.delete_agent(&agent_id).await?;
        println!("Deleted agent: {agent_id}");
    }
    Ok(code)
}

/// Single-shot docs question through the approval-gated remote toolset
async fn docs(question: &str) -> Result<i32> {
    let service = SimulatedService::new();
    let roster = AgentRoster::new();

    let mut catalog = ToolCatalog::new();
    let toolset = docs_toolset(ApprovalPolicy::AlwaysApprove);
    catalog.register_remote(toolset)?;

    let mut definition = AgentDefinition::new("docs-agent", DOCS_AGENT_INSTRUCTIONS);
    definition.tools = catalog.declarations();
    let agent = service.create_agent(definition).await?;
    roster.admit(&agent)?;

    // The gate trusts this server unconditionally and attaches the
    // shared-secret header to every approval.
    let gate = Arc::new(
        ApprovalGate::new(ApprovalPolicy::AlwaysApprove).with_headers(docs_headers()),
    );
    let driver = RunDriver::new(Arc::new(service.clone()), Arc::new(catalog), gate);

    let resources = ToolResources::default().with_remote(
        DOCS_SERVER_LABEL,
        docs_headers(),
        RequireApproval::Always,
    );
    let session = Session::open(Arc::new(service.clone()), driver, agent.clone())
        .await?
        .with_resources(resources);
    service.enqueue_script(session.thread_id(), demo::docs_script(question));

    let run = console::stream_turn(&session, question).await?;
    if run.status == RunStatus::Completed {
        println!("Conversation:");
        println!("{}", "-".repeat(50));
        for message in session.conversation().await? {
            println!("{}: {}", message.role, message.text_content());
            println!("{}", "-".repeat(50));
        }
    }
    let code = console::report_outcome(&run);

    session.close().await?;
    service.delete_agent(&agent.id).await?;
    Ok(code)
}
