//! Console input/output for the interactive loop

use colored::Colorize;
use conductor_core::error::{ConductorError, ConductorResult};
use conductor_core::run::{Run, RunStatus};
use conductor_core::session::Session;
use futures::StreamExt;
use std::io::{self, Write};

/// Read one prompt from stdin
///
/// Returns `None` on EOF or the literal `quit` (case-insensitive).
pub fn read_prompt() -> Option<String> {
    loop {
        print!("Enter a prompt (or type 'quit' to exit): ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        let prompt = line.trim();
        if prompt.eq_ignore_ascii_case("quit") {
            return None;
        }
        if prompt.is_empty() {
            println!("Please enter a prompt.");
            continue;
        }
        return Some(prompt.to_string());
    }
}

/// Stream one turn to stdout, chunk by chunk
///
/// Reply text prints green while the run is producing it; a run failure
/// is reported without ending the session.
pub async fn stream_turn(session: &Session, prompt: &str) -> ConductorResult<Run> {
    let mut stream = session.submit_streaming(prompt).await?;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(text) => {
                print!("{}", text.green());
                let _ = io::stdout().flush();
            }
            Err(ConductorError::RunFailed { code, message }) => {
                println!();
                println!("Run failure: [{code}] {message}");
            }
            Err(err) => {
                println!();
                println!("Run failure: {err}");
            }
        }
    }
    println!();
    stream.finish().await
}

/// Report a terminal run for single-shot commands
///
/// Returns the process exit code: `1` for an unrecoverable failure,
/// `0` otherwise.
pub fn report_outcome(run: &Run) -> i32 {
    match run.status {
        RunStatus::Failed => {
            let error = run
                .last_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown error".to_string());
            eprintln!("Run failed: {error}");
            1
        }
        RunStatus::Cancelled => {
            eprintln!("Run cancelled.");
            1
        }
        _ => 0,
    }
}
