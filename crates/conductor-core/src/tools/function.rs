//! Trait for locally-executed function tools

use crate::error::ConductorResult;
use crate::tools::types::{ToolCall, ToolSchema};
use async_trait::async_trait;

/// A native handler the agent can call by name
///
/// Implementations declare a schema for the service and execute locally
/// when the run requests the tool. Failures are surfaced back to the run
/// as failure outputs, so the agent can retry or give up.
#[async_trait]
pub trait FunctionTool: Send + Sync {
    /// Unique tool name, lowercase with underscores (e.g. "submit_support_ticket")
    fn name(&self) -> &str;

    /// Description included in the agent's tool declaration
    fn description(&self) -> &str;

    /// Input schema declared to the service
    fn schema(&self) -> ToolSchema;

    /// Execute the call and produce the output payload
    async fn execute(&self, call: &ToolCall) -> ConductorResult<String>;
}
