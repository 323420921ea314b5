//! CLI command definitions
//!
//! Defines the clap commands for the nodedebug CLI.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Attach to a Node.js process started with --debug and report breakpoint hits
    Attach {
        /// Host of the debug port (default from config, then 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Debug port (default from config, then 5858)
        #[arg(long, short)]
        port: Option<u16>,

        /// Breakpoint as FILE:LINE[@KIND:COUNT][?CONDITION], KIND one of eq, ge, mod.
        /// Can be specified multiple times: -b app.js:12 -b lib/db.js:40@mod:10
        #[arg(long = "break", short = 'b')]
        breakpoints: Vec<String>,

        /// Resume automatically after each stop
        #[arg(long)]
        resume: bool,
    },
}
