//! Agent definitions and the roster of created agents

use crate::error::RegistrationError;
use crate::tools::types::ToolDeclaration;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Everything needed to create an agent with the backing service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Human-readable agent name
    pub name: String,
    /// System instructions
    pub instructions: String,
    /// Declared tools (functions, delegates, remote toolsets)
    pub tools: Vec<ToolDeclaration>,
}

impl AgentDefinition {
    /// Create a definition with no tools
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
        }
    }

    /// Add a tool declaration
    pub fn with_tool(mut self, tool: ToolDeclaration) -> Self {
        self.tools.push(tool);
        self
    }
}

/// An agent created with the backing service
///
/// Immutable once created: changing behavior means creating a new agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Service-assigned id
    pub id: String,
    /// Agent name
    pub name: String,
    /// System instructions
    pub instructions: String,
    /// Declared tools
    pub tools: Vec<ToolDeclaration>,
}

impl Agent {
    /// Ids of the agents this agent delegates to
    pub fn delegate_ids(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter_map(|tool| match tool {
                ToolDeclaration::ConnectedAgent { agent_id, .. } => Some(agent_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Roster of every agent created during this orchestration session
///
/// Delegate tool declarations must reference a roster id, and the
/// "agent calls agent" graph must stay acyclic. Both are checked when an
/// agent is admitted, before any run can involve it.
#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    agents: Arc<RwLock<HashMap<String, Agent>>>,
}

impl AgentRoster {
    /// Create an empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a created agent, validating its delegation edges
    pub fn admit(&self, agent: &Agent) -> Result<(), RegistrationError> {
        let mut agents = self.agents.write();
        for delegate in agent.delegate_ids() {
            if delegate != agent.id && !agents.contains_key(delegate) {
                return Err(RegistrationError::DanglingDelegation {
                    tool: agent.name.clone(),
                    agent_id: delegate.to_string(),
                });
            }
        }
        if reaches(&agents, agent, &agent.id) {
            return Err(RegistrationError::DelegationCycle {
                agent: agent.name.clone(),
            });
        }
        agents.insert(agent.id.clone(), agent.clone());
        Ok(())
    }

    /// Whether an agent id is known
    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.read().contains_key(agent_id)
    }

    /// Look up an agent by id
    pub fn get(&self, agent_id: &str) -> Option<Agent> {
        self.agents.read().get(agent_id).cloned()
    }

    /// Number of admitted agents
    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    /// Whether the roster is empty
    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// Ids of every admitted agent
    pub fn ids(&self) -> Vec<String> {
        self.agents.read().keys().cloned().collect()
    }
}

/// Depth-first search over delegation edges, looking for `target`
fn reaches(agents: &HashMap<String, Agent>, from: &Agent, target: &str) -> bool {
    let mut visited = HashSet::new();
    let mut stack: Vec<String> = from
        .delegate_ids()
        .into_iter()
        .map(str::to_string)
        .collect();

    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(agent) = agents.get(&id) {
            stack.extend(agent.delegate_ids().into_iter().map(str::to_string));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, name: &str, delegates: &[&str]) -> Agent {
        Agent {
            id: id.into(),
            name: name.into(),
            instructions: "test".into(),
            tools: delegates
                .iter()
                .map(|delegate| ToolDeclaration::ConnectedAgent {
                    agent_id: (*delegate).into(),
                    name: format!("call_{delegate}"),
                    description: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn admit_validates_delegates_exist() {
        let roster = AgentRoster::new();
        let err = roster
            .admit(&agent("a1", "parent", &["a_missing"]))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::DanglingDelegation { .. }
        ));
        assert!(roster.is_empty());
    }

    #[test]
    fn admit_accepts_a_delegation_chain() {
        let roster = AgentRoster::new();
        roster.admit(&agent("a1", "leaf", &[])).unwrap();
        roster.admit(&agent("a2", "mid", &["a1"])).unwrap();
        roster.admit(&agent("a3", "root", &["a2", "a1"])).unwrap();
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let roster = AgentRoster::new();
        let err = roster.admit(&agent("a1", "ouroboros", &["a1"])).unwrap_err();
        assert!(matches!(err, RegistrationError::DelegationCycle { .. }));
    }
}
