//! Tool catalog, invocation, and approval handling

pub mod approval;
pub mod catalog;
pub mod function;
pub mod invoker;
pub mod types;

pub use approval::{ApprovalGate, ApprovalPolicy, ApprovalRequest};
pub use catalog::{RegisteredTool, RemoteToolConfig, ToolCatalog, ToolKind};
pub use function::FunctionTool;
pub use invoker::{DEFAULT_LOCAL_CALL_LIMIT, LocalCallBudget, ToolInvoker, ToolOutcome};
pub use types::{ToolCall, ToolDeclaration, ToolOutput, ToolParameter, ToolSchema};
