//! Tool-related type definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tool call requested by an in-progress run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call, assigned by the service
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// Arguments decoded from the call payload
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new<S: Into<String>>(
        id: S,
        name: S,
        arguments: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Get a typed argument value
    pub fn get_argument<T>(&self, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.arguments
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get_argument::<String>(key)
    }
}

/// The result of executing a tool call, submitted back to the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Id of the call this output answers
    pub call_id: String,
    /// Whether the call succeeded
    pub success: bool,
    /// Success payload
    pub output: Option<String>,
    /// Failure reason
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful output
    pub fn success(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Create a failure output
    pub fn failure(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Payload for submission: the output on success, the error otherwise
    pub fn payload(&self) -> &str {
        match (&self.output, &self.error) {
            (Some(output), _) => output,
            (None, Some(error)) => error,
            (None, None) => "",
        }
    }
}

/// Parameter definition inside a tool schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Parameter type (string, number, boolean, object, array)
    pub param_type: String,
    /// Whether this parameter is required
    pub required: bool,
}

impl ToolParameter {
    /// Create a required string parameter
    pub fn string<S: Into<String>>(name: S, description: S) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type: "string".to_string(),
            required: true,
        }
    }

    /// Make the parameter optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Structural description of a tool's input, declared for the service
///
/// The service validates argument shapes against this; local dispatch only
/// checks that required keys are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema of the input parameters
    pub parameters: serde_json::Value,
    /// Names of the required parameters
    pub required: Vec<String>,
}

impl ToolSchema {
    /// Assemble a schema from parameter definitions
    pub fn new<S: Into<String>>(name: S, description: S, parameters: Vec<ToolParameter>) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in parameters {
            if param.required {
                required.push(param.name.clone());
            }

            let mut param_schema = serde_json::Map::new();
            param_schema.insert("type".to_string(), param.param_type.into());
            param_schema.insert("description".to_string(), param.description.into());
            properties.insert(param.name, param_schema.into());
        }

        let parameters_schema = serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        });

        Self {
            name: name.into(),
            description: description.into(),
            parameters: parameters_schema,
            required,
        }
    }
}

/// A tool as declared to the service when creating an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDeclaration {
    /// A locally-executed function
    Function { schema: ToolSchema },
    /// Another agent wrapped as a callable tool
    ConnectedAgent {
        agent_id: String,
        name: String,
        description: String,
    },
    /// A remote protocol-described toolset
    RemoteToolset {
        server_label: String,
        server_url: String,
    },
}

impl ToolDeclaration {
    /// The name this declaration registers under
    pub fn name(&self) -> &str {
        match self {
            Self::Function { schema } => &schema.name,
            Self::ConnectedAgent { name, .. } => name,
            Self::RemoteToolset { server_label, .. } => server_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_collects_required_parameters() {
        let schema = ToolSchema::new(
            "submit_support_ticket",
            "Submit a support ticket.",
            vec![
                ToolParameter::string("emailAddress", "Submitter email."),
                ToolParameter::string("description", "Issue description."),
                ToolParameter::string("severity", "Optional severity.").optional(),
            ],
        );
        assert_eq!(schema.required, vec!["emailAddress", "description"]);
        assert_eq!(schema.parameters["type"], "object");
        assert!(schema.parameters["properties"]["severity"].is_object());
    }

    #[test]
    fn tool_output_payload_prefers_output() {
        let ok = ToolOutput::success("call_1", "done");
        assert_eq!(ok.payload(), "done");
        let bad = ToolOutput::failure("call_2", "boom");
        assert_eq!(bad.payload(), "boom");
    }

    #[test]
    fn typed_argument_lookup() {
        let mut arguments = HashMap::new();
        arguments.insert("count".to_string(), serde_json::json!(3));
        arguments.insert("label".to_string(), serde_json::json!("tickets"));
        let call = ToolCall::new("call_1", "counter", arguments);
        assert_eq!(call.get_argument::<u32>("count"), Some(3));
        assert_eq!(call.get_string("label").as_deref(), Some("tickets"));
        assert_eq!(call.get_string("missing"), None);
    }
}
