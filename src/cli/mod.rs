//! CLI command handling
//!
//! Runs a session for the `attach` command and formats its events.

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::Result;
use crate::session::{BreakpointSpec, DebugSession, SessionEvent};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Attach {
            host,
            port,
            breakpoints,
            resume,
        } => {
            // Parse everything before touching the network
            let specs = breakpoints
                .iter()
                .map(|s| BreakpointSpec::parse(s))
                .collect::<Result<Vec<_>>>()?;

            let mut connection = config.connection.clone();
            if let Some(host) = host {
                connection.host = host;
            }
            if let Some(port) = port {
                connection.port = port;
            }
            let address = connection.address();

            let mut session = DebugSession::attach(&address).await?;
            println!("Attached to {}", address);

            for spec in specs {
                let location = format!("{}:{}", spec.file, spec.line);
                let break_on = spec.break_on;
                match session.add_breakpoint(spec.into_binding()).await {
                    Ok(id) => println!("Breakpoint {} at {} ({})", id, location, break_on),
                    Err(e) if e.is_connection_error() => return Err(e),
                    Err(e) => eprintln!("Could not set breakpoint at {}: {}", location, e),
                }
            }

            run_events(&mut session, resume).await
        }
    }
}

async fn run_events(session: &mut DebugSession, resume: bool) -> Result<()> {
    let mut version_reported = false;

    loop {
        let event = session.next_event().await;

        if !version_reported {
            if let Some(version) = session.node_version() {
                println!("Engine: node v{}", version);
                version_reported = true;
            }
        }

        let stopped = match &event {
            SessionEvent::BreakpointHit { hits, script, line } => {
                for hit in hits {
                    println!(
                        "Breakpoint {} hit at {} (hit count {})",
                        hit.id,
                        format_location(script, line),
                        hit.hit_count
                    );
                }
                true
            }
            SessionEvent::Paused { script, line } => {
                println!("Paused at {}", format_location(script, line));
                true
            }
            SessionEvent::Exception {
                uncaught,
                text,
                script,
                line,
            } => {
                println!(
                    "{} exception at {}: {}",
                    if *uncaught { "Uncaught" } else { "Caught" },
                    format_location(script, line),
                    text.as_deref().unwrap_or("<no description>")
                );
                true
            }
            SessionEvent::ScriptCompiled { name } => {
                tracing::debug!(script = name.as_deref().unwrap_or("<anonymous>"), "compiled");
                false
            }
            SessionEvent::Disconnected => {
                println!("Debugger disconnected");
                return Ok(());
            }
        };

        if stopped && resume {
            session.continue_execution().await?;
        }
    }
}

fn format_location(script: &Option<String>, line: &Option<u32>) -> String {
    match (script, line) {
        (Some(script), Some(line)) => format!("{}:{}", script, line),
        (Some(script), None) => script.clone(),
        (None, Some(line)) => format!("<unknown>:{}", line),
        (None, None) => "<unknown>".to_string(),
    }
}
