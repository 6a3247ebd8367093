//! Conductor core: run and tool-dispatch orchestration
//!
//! Drives a long-running run of a conversation thread against a
//! service-hosted agent: watches the run's lifecycle (by polling or by
//! consuming an update stream), resolves required tool actions through a
//! catalog of local functions, sub-agent delegates, and remote protocol
//! toolsets, gates remote calls behind approval, and resumes the run until
//! it reaches a terminal status.
//!
//! The backing service is an opaque collaborator behind [`service::AgentService`];
//! [`service::SimulatedService`] provides a deterministic, scripted
//! in-process implementation for tests and demos.

pub mod agent;
pub mod config;
pub mod driver;
pub mod error;
pub mod run;
pub mod service;
pub mod session;
pub mod thread;
pub mod tools;

pub use agent::{Agent, AgentDefinition, AgentRoster};
pub use config::ServiceConfig;
pub use driver::{RunDriver, RunDriverConfig, TurnStream};
pub use error::{ConductorError, ConductorResult, RegistrationError};
pub use run::{RequiredAction, Run, RunError, RunStatus, RunUpdate};
pub use service::{
    AgentService, RequireApproval, RunUpdateStream, ScriptedCall, SimulatedService, ToolResources,
    TurnScript,
};
pub use session::Session;
pub use thread::{ListOrder, Message, MessageContent, MessageRole};
pub use tools::{
    ApprovalGate, ApprovalPolicy, ApprovalRequest, FunctionTool, LocalCallBudget, RemoteToolConfig,
    ToolCall, ToolCatalog, ToolDeclaration, ToolInvoker, ToolKind, ToolOutcome, ToolOutput,
    ToolParameter, ToolSchema,
};
