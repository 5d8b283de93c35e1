// ABOUTME: Entry point for the convoy CLI application.
// ABOUTME: Parses arguments, wires the orchestrator, and dispatches commands.

mod cli;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use convoy::approval::AutoApprove;
use convoy::config::{self, CiPlatform, DeploymentConfig};
use convoy::diagnostics::{Diagnostics, Warning};
use convoy::error::Result;
use convoy::events::EventBus;
use convoy::handler::{DryRunHandler, HandlerRegistry};
use convoy::health::HttpProbe;
use convoy::pipeline::PipelineOrchestrator;
use convoy::rollback::VersionLedger;
use convoy::store::InMemoryRepository;
use output::{Output, OutputMode};
use std::env;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    if let Err(e) = run(cli, output).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut output: Output) -> Result<()> {
    match cli.command {
        Commands::Init { id, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, id.as_deref(), force)
        }
        Commands::Run { approver } => {
            let config = discover_config()?;
            let orchestrator = build_orchestrator(&config, &approver);

            // Surface suspect-but-legal settings before the run starts.
            let mut diagnostics = Diagnostics::default();
            for warning in convoy::pipeline::validate(&config).warnings {
                diagnostics.warn(Warning::validation(warning));
            }
            for warning in diagnostics.warnings() {
                output.progress(&format!("Warning: {}", warning.message));
            }

            output.start_timer();
            output.progress(&format!(
                "Deploying {} version {} to {} ({} stage(s))",
                config.name,
                config.version,
                config.environment,
                config.stages.len()
            ));

            let result = orchestrator
                .execute_pipeline(&config, CancellationToken::new())
                .await;
            output.deployment(&result);

            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Rollback { version, reason } => {
            let mut config = discover_config()?;
            let orchestrator = build_orchestrator(&config, "convoy");

            // Command-line arguments win over the configured rollback
            // settings for an explicit rollback.
            let mut rollback = config.rollback.take().unwrap_or_default();
            if version.is_some() {
                rollback.target_version = version;
            }
            if reason.is_some() {
                rollback.reason = reason;
            }
            config.rollback = Some(rollback);

            let result = orchestrator
                .rollback(&config, &CancellationToken::new())
                .await;
            output.rollback(&result);

            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Versions => {
            let config = discover_config()?;
            let orchestrator = build_orchestrator(&config, "convoy");

            let options = orchestrator.ledger().rollback_options(&config.environment);
            if options.is_empty() {
                output.progress(&format!(
                    "No rollback-eligible versions recorded for environment '{}'",
                    config.environment
                ));
                return Ok(());
            }
            for version in options {
                let marker = if version.is_active { " (active)" } else { "" };
                output.progress(&format!(
                    "{} deployed {}{}",
                    version.version,
                    version.deployed_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    marker
                ));
            }
            Ok(())
        }
        Commands::Status => {
            let config = discover_config()?;
            let orchestrator = build_orchestrator(&config, "convoy");

            output.progress(&format!("Deployment: {} ({})", config.name, config.id));
            output.progress(&format!("Version: {}", config.version));
            output.progress(&format!("Environment: {}", config.environment));
            output.progress(&format!("Stages: {}", config.stages.len()));
            match orchestrator.ledger().active_version(&config.environment) {
                Some(active) => output.progress(&format!("Active version: {}", active.version)),
                None => output.progress("Active version: none recorded"),
            }
            Ok(())
        }
    }
}

fn discover_config() -> Result<DeploymentConfig> {
    let cwd = env::current_dir()?;
    DeploymentConfig::discover(&cwd)
}

/// Wire the orchestrator: built-in dry-run handlers for every platform,
/// auto-approval under the given name, HTTP health probes, and a version
/// ledger seeded from the config file's history.
fn build_orchestrator(config: &DeploymentConfig, approver: &str) -> PipelineOrchestrator {
    let handlers = Arc::new(HandlerRegistry::new());
    let dry_run = Arc::new(DryRunHandler::new());
    for platform in CiPlatform::ALL {
        handlers.register(platform, dry_run.clone());
    }

    let events = EventBus::default();
    let ledger = Arc::new(VersionLedger::new(
        Arc::new(InMemoryRepository::new()),
        events.clone(),
    ));
    ledger.seed(config.versions.iter().cloned());
    if let Some(rollback) = &config.rollback {
        ledger.configure_auto_rollback(rollback.triggers.clone());
    }

    PipelineOrchestrator::new(
        handlers,
        Arc::new(AutoApprove::new(approver)),
        Arc::new(HttpProbe::new()),
        ledger,
        events,
    )
}
