//! nodedebug - attach to a Node.js debug port and drive breakpoints
//!
//! Breakpoints support pass-count policies (break on the Nth hit, from the
//! Nth hit on, or every Nth hit) that are enforced by the engine itself.

use clap::Parser;
use nodedebug::common::{config::Config, logging};
use nodedebug::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "nodedebug", about = "Node.js debugger protocol client")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let level = config.logging.level.as_deref();
    let _guard = match (config.logging.file, logging::default_log_dir()) {
        (true, Some(dir)) => match logging::init_file(&dir, level) {
            Ok((path, guard)) => {
                tracing::debug!(path = %path.display(), "logging to file");
                Some(guard)
            }
            Err(e) => {
                logging::init_cli(level);
                tracing::warn!(error = %e, "could not open log file");
                None
            }
        },
        _ => {
            logging::init_cli(level);
            None
        }
    };

    if let Err(e) = cli::dispatch(cli.command, &config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
