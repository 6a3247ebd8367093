//! Concrete tools and agent definitions for Conductor demos and tests

pub mod docs;
pub mod support;
pub mod triage;

pub use docs::{docs_headers, docs_toolset};
pub use support::{SUPPORT_AGENT_INSTRUCTIONS, SupportTicketTool};
pub use triage::build_triage_team;
