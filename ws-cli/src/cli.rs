// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "wstpl")]
#[command(about = "Compile workspace specs into workflow templates")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Compile a spec and print the workflow template
    Compile {
        /// Workspace spec file
        spec: PathBuf,
        /// System settings file (domain, node pools, API URL)
        #[arg(short, long)]
        settings: PathBuf,
        /// Platform service exposed to containers, as NAME=URL (repeatable)
        #[arg(long = "service", value_name = "NAME=URL")]
        services: Vec<String>,
    },
    /// Parse and validate a spec without compiling it
    Validate {
        /// Workspace spec file
        spec: PathBuf,
    },
    /// Print the parameters a compiled template would expose
    Params {
        /// Workspace spec file
        spec: PathBuf,
        /// System settings file (domain, node pools, API URL)
        #[arg(short, long)]
        settings: PathBuf,
    },
}
