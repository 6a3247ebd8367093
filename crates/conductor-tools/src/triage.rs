//! Ticket triage agent team
//!
//! A parent triage agent delegating to three specialist sub-agents:
//! priority, owning team, and effort. The sub-agents are created first,
//! admitted to the roster, and registered as delegate tools; only then is
//! the parent created with the connected-agent declarations.

use conductor_core::agent::{Agent, AgentDefinition, AgentRoster};
use conductor_core::error::ConductorResult;
use conductor_core::service::AgentService;
use conductor_core::tools::{ToolCatalog, ToolDeclaration};

pub const PRIORITY_AGENT_NAME: &str = "priority_agent";

pub const PRIORITY_AGENT_INSTRUCTIONS: &str = "\
Assess how urgent a ticket is based on its description.

Respond with one of the following levels:
- High: User-facing or blocking issues
- Medium: Time-sensitive but not breaking anything
- Low: Cosmetic or non-urgent tasks

Only output the urgency level and a very brief explanation.";

pub const TEAM_AGENT_NAME: &str = "team_agent";

pub const TEAM_AGENT_INSTRUCTIONS: &str = "\
Decide which team should own each ticket.

Choose from the following teams:
- Frontend
- Backend
- Infrastructure
- Marketing

Base your answer on the content of the ticket. Respond with the team name and a very brief explanation.";

pub const EFFORT_AGENT_NAME: &str = "effort_agent";

pub const EFFORT_AGENT_INSTRUCTIONS: &str = "\
Estimate how much work each ticket will require.

Use the following scale:
- Small: Can be completed in a day
- Medium: 2-3 days of work
- Large: Multi-day or cross-team effort

Base your estimate on the complexity implied by the ticket. Respond with the effort level and a brief justification.";

pub const TRIAGE_AGENT_INSTRUCTIONS: &str = "\
Triage the given ticket. Use the connected tools to determine the ticket's priority, \
which team it should be assigned to, and how much effort it may take.";

/// Create the three specialist agents and the triage parent
///
/// Returns the parent; the specialists are reachable through the roster.
pub async fn build_triage_team(
    service: &dyn AgentService,
    roster: &AgentRoster,
    catalog: &mut ToolCatalog,
) -> ConductorResult<Agent> {
    let specialists = [
        (
            PRIORITY_AGENT_NAME,
            PRIORITY_AGENT_INSTRUCTIONS,
            "Assess the priority of a ticket",
        ),
        (
            TEAM_AGENT_NAME,
            TEAM_AGENT_INSTRUCTIONS,
            "Determines which team should take the ticket",
        ),
        (
            EFFORT_AGENT_NAME,
            EFFORT_AGENT_INSTRUCTIONS,
            "Determines the effort required to complete the ticket",
        ),
    ];

    let mut declarations = Vec::new();
    for (name, instructions, description) in specialists {
        let agent = service
            .create_agent(AgentDefinition::new(name, instructions))
            .await?;
        roster.admit(&agent)?;
        catalog.register_delegate(name, &agent.id, description, roster)?;
        declarations.push(ToolDeclaration::ConnectedAgent {
            agent_id: agent.id,
            name: name.to_string(),
            description: description.to_string(),
        });
        tracing::debug!(agent = name, "specialist agent created");
    }

    let suffix = uuid::Uuid::new_v4().simple().to_string()[..6].to_string();
    let mut definition = AgentDefinition::new(
        format!("triage-agent-{suffix}"),
        TRIAGE_AGENT_INSTRUCTIONS,
    );
    definition.tools = declarations;

    let triage = service.create_agent(definition).await?;
    roster.admit(&triage)?;
    Ok(triage)
}
