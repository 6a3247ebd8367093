//! Command-line argument definitions

use clap::{Parser, Subcommand};

/// Conductor: orchestrate service-backed conversational agents
#[derive(Parser, Debug)]
#[command(name = "conductor", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat with a support agent that files tickets
    Chat,
    /// Triage a ticket through priority/team/effort sub-agents (single-shot)
    Triage {
        /// The ticket text to triage
        prompt: Option<String>,
    },
    /// Ask a question answered through the remote docs toolset (single-shot)
    Docs {
        /// The question to ask
        question: Option<String>,
    },
}
