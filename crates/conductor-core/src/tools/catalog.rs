//! Catalog of registered tools

use crate::agent::AgentRoster;
use crate::error::RegistrationError;
use crate::tools::approval::ApprovalPolicy;
use crate::tools::function::FunctionTool;
use crate::tools::types::{ToolDeclaration, ToolSchema};
use std::collections::HashMap;
use std::sync::Arc;

/// Invocation kind of a registered tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Executed locally by a registered handler
    LocalFunction,
    /// Resolved by the backing service through a connected agent
    SubAgentDelegation,
    /// Executed by a remote tool server after approval
    RemoteProtocolTool,
}

/// Connection settings for a remote protocol-described toolset
#[derive(Debug, Clone)]
pub struct RemoteToolConfig {
    /// Label identifying the tool server
    pub server_label: String,
    /// Tool server URL
    pub server_url: String,
    /// How approval requests for this server are resolved
    pub approval: ApprovalPolicy,
    /// Headers attached to approved calls (e.g. a shared-secret header)
    pub headers: HashMap<String, String>,
}

impl RemoteToolConfig {
    /// Create a config with manual approval and no headers
    pub fn new(server_label: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            server_label: server_label.into(),
            server_url: server_url.into(),
            approval: ApprovalPolicy::Manual,
            headers: HashMap::new(),
        }
    }

    /// Set the approval policy
    pub fn with_approval(mut self, approval: ApprovalPolicy) -> Self {
        self.approval = approval;
        self
    }

    /// Attach a header to approved calls
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A tool entry resolved from the catalog
#[derive(Clone)]
pub enum RegisteredTool {
    /// A local function with its handler
    Function(Arc<dyn FunctionTool>),
    /// A sub-agent delegation, opaque to local dispatch
    Delegate { agent_id: String, description: String },
    /// A remote toolset requiring approval before execution
    Remote(RemoteToolConfig),
}

impl RegisteredTool {
    /// The invocation kind of this entry
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Function(_) => ToolKind::LocalFunction,
            Self::Delegate { .. } => ToolKind::SubAgentDelegation,
            Self::Remote(_) => ToolKind::RemoteProtocolTool,
        }
    }

    /// The schema declared for this entry, if it has one
    pub fn schema(&self) -> Option<ToolSchema> {
        match self {
            Self::Function(tool) => Some(tool.schema()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function(tool) => f.debug_tuple("Function").field(&tool.name()).finish(),
            Self::Delegate { agent_id, .. } => {
                f.debug_struct("Delegate").field("agent_id", agent_id).finish()
            }
            Self::Remote(config) => f
                .debug_struct("Remote")
                .field("server_label", &config.server_label)
                .finish(),
        }
    }
}

/// Registry mapping a tool name to its kind, schema, and handler
///
/// Kinds are resolved once here, at registration time; the invoker never
/// re-interprets a name per call.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a local function tool
    pub fn register_function(
        &mut self,
        tool: Arc<dyn FunctionTool>,
    ) -> Result<(), RegistrationError> {
        let name = tool.name().to_string();
        self.insert(name, RegisteredTool::Function(tool))
    }

    /// Register another agent as a callable tool
    ///
    /// The agent must already exist in the roster; referencing an unknown
    /// id is a `DanglingDelegation` error.
    pub fn register_delegate(
        &mut self,
        name: impl Into<String>,
        agent_id: impl Into<String>,
        description: impl Into<String>,
        roster: &AgentRoster,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        let agent_id = agent_id.into();
        if !roster.contains(&agent_id) {
            return Err(RegistrationError::DanglingDelegation {
                tool: name,
                agent_id,
            });
        }
        self.insert(
            name,
            RegisteredTool::Delegate {
                agent_id,
                description: description.into(),
            },
        )
    }

    /// Register a remote protocol toolset under its server label
    pub fn register_remote(&mut self, config: RemoteToolConfig) -> Result<(), RegistrationError> {
        self.insert(config.server_label.clone(), RegisteredTool::Remote(config))
    }

    /// Resolve a tool by name
    pub fn resolve(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Whether a tool name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Declarations for agent creation, in registration order
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).map(|tool| (name, tool)))
            .map(|(name, tool)| match tool {
                RegisteredTool::Function(function) => ToolDeclaration::Function {
                    schema: function.schema(),
                },
                RegisteredTool::Delegate {
                    agent_id,
                    description,
                } => ToolDeclaration::ConnectedAgent {
                    agent_id: agent_id.clone(),
                    name: name.clone(),
                    description: description.clone(),
                },
                RegisteredTool::Remote(config) => ToolDeclaration::RemoteToolset {
                    server_label: config.server_label.clone(),
                    server_url: config.server_url.clone(),
                },
            })
            .collect()
    }

    fn insert(&mut self, name: String, tool: RegisteredTool) -> Result<(), RegistrationError> {
        if self.tools.contains_key(&name) {
            return Err(RegistrationError::DuplicateTool { name });
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::error::ConductorResult;
    use crate::tools::types::{ToolCall, ToolParameter};
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl FunctionTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input back."
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new(
                self.name(),
                self.description(),
                vec![ToolParameter::string("text", "Text to echo.")],
            )
        }

        async fn execute(&self, call: &ToolCall) -> ConductorResult<String> {
            Ok(call.get_string("text").unwrap_or_default())
        }
    }

    fn roster_with(id: &str) -> AgentRoster {
        let roster = AgentRoster::new();
        roster
            .admit(&Agent {
                id: id.into(),
                name: "helper".into(),
                instructions: String::new(),
                tools: Vec::new(),
            })
            .unwrap();
        roster
    }

    #[test]
    fn duplicate_registration_keeps_the_original() {
        let mut catalog = ToolCatalog::new();
        catalog.register_function(Arc::new(EchoTool)).unwrap();
        let err = catalog.register_function(Arc::new(EchoTool)).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateTool {
                name: "echo".into()
            }
        );
        // Original entry unchanged.
        assert_eq!(
            catalog.resolve("echo").unwrap().kind(),
            ToolKind::LocalFunction
        );
        assert_eq!(catalog.names(), ["echo"]);
    }

    #[test]
    fn resolve_returns_same_kind_and_schema_after_register() {
        let mut catalog = ToolCatalog::new();
        catalog.register_function(Arc::new(EchoTool)).unwrap();
        let tool = catalog.resolve("echo").unwrap();
        assert_eq!(tool.kind(), ToolKind::LocalFunction);
        assert_eq!(tool.schema().unwrap(), EchoTool.schema());
    }

    #[test]
    fn delegate_requires_a_known_agent() {
        let mut catalog = ToolCatalog::new();
        let roster = AgentRoster::new();
        let err = catalog
            .register_delegate("priority_agent", "agent_1", "priority", &roster)
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DanglingDelegation { .. }));

        let roster = roster_with("agent_1");
        catalog
            .register_delegate("priority_agent", "agent_1", "priority", &roster)
            .unwrap();
        assert_eq!(
            catalog.resolve("priority_agent").unwrap().kind(),
            ToolKind::SubAgentDelegation
        );
    }

    #[test]
    fn declarations_follow_registration_order() {
        let mut catalog = ToolCatalog::new();
        catalog
            .register_remote(RemoteToolConfig::new("docs", "https://docs.test/api"))
            .unwrap();
        catalog.register_function(Arc::new(EchoTool)).unwrap();
        let declarations = catalog.declarations();
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].name(), "docs");
        assert_eq!(declarations[1].name(), "echo");
    }
}
