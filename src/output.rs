// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use convoy::pipeline::{DeploymentResult, StageResult};
use convoy::rollback::RollbackResult;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print one stage's outcome (suppressed in quiet/json mode).
    pub fn stage(&self, result: &StageResult) {
        if self.mode != OutputMode::Normal {
            return;
        }
        let mark = if result.success { "✓" } else { "✗" };
        match &result.error {
            Some(error) => println!("  {mark} {}: {error}", result.stage_name),
            None => println!("  {mark} {}", result.stage_name),
        }
    }

    /// Print the final deployment outcome.
    pub fn deployment(&self, result: &DeploymentResult) {
        match self.mode {
            OutputMode::Normal => {
                for stage in &result.stage_results {
                    self.stage(stage);
                }
                let elapsed = self.elapsed_secs();
                if result.success {
                    println!("Deployment {} succeeded ({elapsed:.1}s)", result.deployment_id);
                } else {
                    eprintln!("Deployment {} failed: {}", result.deployment_id, result.message);
                }
            }
            OutputMode::Quiet => {
                println!("{}: {}", result.deployment_id, result.state);
            }
            OutputMode::Json => self.json(result),
        }
    }

    /// Print the outcome of an explicit rollback.
    pub fn rollback(&self, result: &RollbackResult) {
        match self.mode {
            OutputMode::Normal => {
                if result.success {
                    let version = result.rolled_back_to.as_deref().unwrap_or("unknown");
                    println!("Rolled back to version {version}");
                } else {
                    let error = result.error.as_deref().unwrap_or("unknown error");
                    eprintln!("Rollback failed: {error}");
                }
            }
            OutputMode::Quiet => {
                println!("{}: {}", result.rollback_id, result.status);
            }
            OutputMode::Json => self.json(result),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonError {
                    event: "error",
                    message,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    fn json<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            println!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonError<'a> {
    event: &'a str,
    message: &'a str,
}
