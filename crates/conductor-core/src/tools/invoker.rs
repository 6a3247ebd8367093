//! Tool invocation engine

use crate::error::{ConductorError, ConductorResult};
use crate::tools::approval::ApprovalRequest;
use crate::tools::catalog::{RegisteredTool, ToolCatalog};
use crate::tools::types::{ToolCall, ToolOutput};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Default cap on consecutive local-function calls per run
pub const DEFAULT_LOCAL_CALL_LIMIT: u32 = 5;

/// Per-run budget of local-function invocations
///
/// Guards against an agent looping on the same tool forever: exceeding the
/// limit fails the run instead of silently dropping the call.
#[derive(Debug)]
pub struct LocalCallBudget {
    used: AtomicU32,
    limit: u32,
}

impl LocalCallBudget {
    /// Create a budget with the given limit
    pub fn new(limit: u32) -> Self {
        Self {
            used: AtomicU32::new(0),
            limit,
        }
    }

    /// Charge one invocation against the budget
    pub fn charge(&self) -> ConductorResult<()> {
        let used = self.used.fetch_add(1, Ordering::SeqCst);
        if used >= self.limit {
            return Err(ConductorError::ToolCallLimitExceeded { limit: self.limit });
        }
        Ok(())
    }

    /// Invocations charged so far
    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }
}

impl Default for LocalCallBudget {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_CALL_LIMIT)
    }
}

/// The result of dispatching a single tool call
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// The tool executed and produced an output
    Output(ToolOutput),
    /// The call is a remote protocol tool and needs an approval decision
    NeedsApproval(ApprovalRequest),
    /// The call could not be dispatched (unknown tool, bad arguments, handler failure)
    InvocationError {
        call_id: String,
        tool: String,
        reason: String,
    },
}

impl ToolOutcome {
    /// Convert the outcome into a submittable output
    ///
    /// Invocation errors become failure outputs so the agent sees the
    /// reason and may retry with different arguments.
    pub fn into_output(self) -> Option<ToolOutput> {
        match self {
            Self::Output(output) => Some(output),
            Self::InvocationError {
                call_id, reason, ..
            } => Some(ToolOutput::failure(call_id, reason)),
            Self::NeedsApproval(_) => None,
        }
    }
}

/// Executes tool calls of any kind against the catalog
///
/// Local functions run here; sub-agent delegation is resolved by the
/// backing service and never reaches local execution; remote protocol
/// tools are turned into approval requests for the gate.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    catalog: Arc<ToolCatalog>,
}

impl ToolInvoker {
    /// Create an invoker over a catalog
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self { catalog }
    }

    /// The underlying catalog
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Dispatch a single call
    ///
    /// Only a budget breach is an `Err`; every other problem is reported
    /// as an outcome the driver can surface back to the run.
    pub async fn invoke(
        &self,
        call: &ToolCall,
        budget: &LocalCallBudget,
    ) -> ConductorResult<ToolOutcome> {
        match self.catalog.resolve(&call.name) {
            None => Ok(ToolOutcome::InvocationError {
                call_id: call.id.clone(),
                tool: call.name.clone(),
                reason: format!("tool '{}' is not registered", call.name),
            }),
            Some(RegisteredTool::Function(tool)) => {
                budget.charge()?;
                if let Some(missing) = missing_required_key(tool.schema().required, call) {
                    return Ok(ToolOutcome::InvocationError {
                        call_id: call.id.clone(),
                        tool: call.name.clone(),
                        reason: format!("missing required argument '{missing}'"),
                    });
                }
                match tool.execute(call).await {
                    Ok(output) => Ok(ToolOutcome::Output(ToolOutput::success(&call.id, output))),
                    Err(err) => {
                        tracing::warn!(tool = %call.name, error = %err, "local tool handler failed");
                        Ok(ToolOutcome::InvocationError {
                            call_id: call.id.clone(),
                            tool: call.name.clone(),
                            reason: err.to_string(),
                        })
                    }
                }
            }
            Some(RegisteredTool::Delegate { agent_id, .. }) => Ok(ToolOutcome::InvocationError {
                call_id: call.id.clone(),
                tool: call.name.clone(),
                reason: format!(
                    "delegation to agent '{agent_id}' is resolved by the service, not locally"
                ),
            }),
            Some(RegisteredTool::Remote(config)) => {
                let mut request = ApprovalRequest::new(&call.id, &call.name);
                request.headers = config.headers.clone();
                Ok(ToolOutcome::NeedsApproval(request))
            }
        }
    }

    /// Dispatch every call of one required action
    ///
    /// Calls are argument-independent within a batch, so they run
    /// concurrently; outcome order matches call order.
    pub async fn invoke_batch(
        &self,
        calls: &[ToolCall],
        budget: &LocalCallBudget,
    ) -> ConductorResult<Vec<ToolOutcome>> {
        let outcomes =
            futures::future::join_all(calls.iter().map(|call| self.invoke(call, budget))).await;
        outcomes.into_iter().collect()
    }
}

fn missing_required_key(required: Vec<String>, call: &ToolCall) -> Option<String> {
    required
        .into_iter()
        .find(|key| !call.arguments.contains_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::approval::ApprovalPolicy;
    use crate::tools::catalog::RemoteToolConfig;
    use crate::tools::function::FunctionTool;
    use crate::tools::types::{ToolParameter, ToolSchema};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Greeter;

    #[async_trait]
    impl FunctionTool for Greeter {
        fn name(&self) -> &str {
            "greet"
        }

        fn description(&self) -> &str {
            "Greet a person by name."
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new(
                self.name(),
                self.description(),
                vec![ToolParameter::string("name", "Who to greet.")],
            )
        }

        async fn execute(&self, call: &ToolCall) -> ConductorResult<String> {
            let name = call.get_string("name").unwrap();
            if name.is_empty() {
                return Err(ConductorError::invocation(self.name(), "empty name"));
            }
            Ok(format!("hello {name}"))
        }
    }

    fn invoker() -> ToolInvoker {
        let mut catalog = ToolCatalog::new();
        catalog.register_function(Arc::new(Greeter)).unwrap();
        catalog
            .register_remote(
                RemoteToolConfig::new("docs", "https://docs.test/api")
                    .with_approval(ApprovalPolicy::Manual)
                    .with_header("SuperSecret", "123456"),
            )
            .unwrap();
        ToolInvoker::new(Arc::new(catalog))
    }

    fn call(name: &str, arguments: &[(&str, &str)]) -> ToolCall {
        ToolCall::new(
            "call_1".to_string(),
            name.to_string(),
            arguments
                .iter()
                .map(|(key, value)| ((*key).to_string(), serde_json::json!(value)))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[tokio::test]
    async fn local_function_success() {
        let invoker = invoker();
        let budget = LocalCallBudget::default();
        let outcome = invoker
            .invoke(&call("greet", &[("name", "ada")]), &budget)
            .await
            .unwrap();
        let output = outcome.into_output().unwrap();
        assert!(output.success);
        assert_eq!(output.output.as_deref(), Some("hello ada"));
        assert_eq!(budget.used(), 1);
    }

    #[tokio::test]
    async fn handler_failure_becomes_a_failure_output() {
        let invoker = invoker();
        let budget = LocalCallBudget::default();
        let outcome = invoker
            .invoke(&call("greet", &[("name", "")]), &budget)
            .await
            .unwrap();
        let output = outcome.into_output().unwrap();
        assert!(!output.success);
        assert!(output.error.as_deref().unwrap().contains("empty name"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_reported() {
        let invoker = invoker();
        let budget = LocalCallBudget::default();
        let outcome = invoker.invoke(&call("greet", &[]), &budget).await.unwrap();
        match outcome {
            ToolOutcome::InvocationError { reason, .. } => {
                assert!(reason.contains("missing required argument 'name'"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_an_invocation_error() {
        let invoker = invoker();
        let budget = LocalCallBudget::default();
        let outcome = invoker
            .invoke(&call("does_not_exist", &[]), &budget)
            .await
            .unwrap();
        assert!(matches!(outcome, ToolOutcome::InvocationError { .. }));
        // Unknown tools never charge the local budget.
        assert_eq!(budget.used(), 0);
    }

    #[tokio::test]
    async fn remote_tool_needs_approval_with_registered_headers() {
        let invoker = invoker();
        let budget = LocalCallBudget::default();
        let outcome = invoker.invoke(&call("docs", &[]), &budget).await.unwrap();
        match outcome {
            ToolOutcome::NeedsApproval(request) => {
                assert_eq!(request.tool_name, "docs");
                assert_eq!(request.headers.get("SuperSecret").unwrap(), "123456");
                assert!(!request.is_resolved());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn the_budget_fails_the_call_after_the_limit() {
        let invoker = invoker();
        let budget = LocalCallBudget::new(2);
        for _ in 0..2 {
            invoker
                .invoke(&call("greet", &[("name", "ada")]), &budget)
                .await
                .unwrap();
        }
        let err = invoker
            .invoke(&call("greet", &[("name", "ada")]), &budget)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConductorError::ToolCallLimitExceeded { limit: 2 }
        ));
    }

    #[tokio::test]
    async fn batch_preserves_call_order() {
        let invoker = invoker();
        let budget = LocalCallBudget::default();
        let calls = vec![
            ToolCall::new("call_a".to_string(), "greet".to_string(), {
                let mut arguments = HashMap::new();
                arguments.insert("name".to_string(), serde_json::json!("a"));
                arguments
            }),
            ToolCall::new("call_b".to_string(), "greet".to_string(), {
                let mut arguments = HashMap::new();
                arguments.insert("name".to_string(), serde_json::json!("b"));
                arguments
            }),
        ];
        let outcomes = invoker.invoke_batch(&calls, &budget).await.unwrap();
        let outputs: Vec<_> = outcomes
            .into_iter()
            .filter_map(ToolOutcome::into_output)
            .collect();
        assert_eq!(outputs[0].call_id, "call_a");
        assert_eq!(outputs[1].call_id, "call_b");
    }
}
