// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "convoy")]
#[command(about = "Deployment pipeline orchestration across CI/CD platforms")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output for CI
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new convoy.yml configuration file
    Init {
        /// Deployment id to seed the template with
        #[arg(long)]
        id: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Execute the deployment pipeline from the configuration file
    Run {
        /// Approver recorded for stages that require approval
        #[arg(long, default_value = "convoy")]
        approver: String,
    },

    /// Roll back the active version for the configured environment
    Rollback {
        /// Target version (defaults to the most recent eligible version)
        #[arg(long)]
        version: Option<String>,

        /// Reason recorded with the rollback
        #[arg(long)]
        reason: Option<String>,
    },

    /// List rollback-eligible versions for the configured environment
    Versions,

    /// Show the configured deployment and its active version
    Status,
}
