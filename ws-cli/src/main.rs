// External crates
use clap::Parser;
use tracing::{debug, error};

// Local modules
mod cli;
mod commands;

use cli::Args;
use commands::execute_command;

fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "warn" };
    if let Err(e) = ws_common::tracing_init::init_with_defaults(default_filter) {
        eprintln!("warning: {}", e);
    }

    debug!(command = ?args.command, "starting wstpl");

    if let Err(e) = execute_command(args) {
        error!(error = %e, code = ?e.code(), "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
