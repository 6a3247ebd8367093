//! Error types for Conductor

use thiserror::Error;

/// Result type alias for Conductor operations
pub type ConductorResult<T> = Result<T, ConductorError>;

/// Errors raised while registering agents and tools
///
/// These are fatal at wiring time: nothing has run yet, so the caller
/// should abort before creating any thread or run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A tool with the same name is already registered
    #[error("duplicate tool: '{name}' is already registered")]
    DuplicateTool { name: String },

    /// A delegate tool references an agent that was never created
    #[error("dangling delegation: tool '{tool}' references unknown agent '{agent_id}'")]
    DanglingDelegation { tool: String, agent_id: String },

    /// Registering the agent would close a delegation cycle
    #[error("delegation cycle: agent '{agent}' reaches itself through its delegates")]
    DelegationCycle { agent: String },
}

/// Main error type for Conductor
#[derive(Error, Debug, Clone)]
pub enum ConductorError {
    /// Missing or invalid configuration; fatal before any run is created
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Fatal registration failure (duplicate tool, dangling delegation, cycle)
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A local tool handler raised or returned malformed output
    #[error("tool '{tool}' invocation failed: {message}")]
    Invocation { tool: String, message: String },

    /// The consecutive local-call budget for a run was exhausted
    #[error("tool call limit exceeded: {limit} consecutive local calls")]
    ToolCallLimitExceeded { limit: u32 },

    /// The backing service reported a terminal run failure
    #[error("run failed [{code}]: {message}")]
    RunFailed { code: String, message: String },

    /// A failure talking to the backing service
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The caller cancelled the operation
    #[error("cancelled")]
    Cancelled,

    /// An operation that is not valid for the current run/thread state
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// JSON encode/decode failure
    #[error("json error: {message}")]
    Json { message: String },
}

impl ConductorError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invocation error for a named tool
    pub fn invocation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an invalid-state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether a retry against the service may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<serde_json::Error> for ConductorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_errors_format_names() {
        let err = RegistrationError::DuplicateTool {
            name: "submit_support_ticket".into(),
        };
        assert!(err.to_string().contains("submit_support_ticket"));

        let err = RegistrationError::DanglingDelegation {
            tool: "priority_agent".into(),
            agent_id: "agent_missing".into(),
        };
        assert!(err.to_string().contains("agent_missing"));
    }

    #[test]
    fn only_transport_is_retryable() {
        assert!(ConductorError::transport("boom").is_retryable());
        assert!(!ConductorError::Cancelled.is_retryable());
        assert!(!ConductorError::config("missing endpoint").is_retryable());
    }
}
