// ABOUTME: Built-in stage handler that validates workflow refs and acknowledges
// ABOUTME: dispatches without contacting a CI platform. Real transports replace it.

use async_trait::async_trait;

use crate::config::StageConfig;

use super::{HandlerError, StageHandler, StageValidation, WorkflowOutcome};

/// Handler the CLI registers by default. It checks that the stage's
/// workflow reference is well-formed, then records the dispatch instead
/// of triggering it, so a pipeline can be exercised end to end without
/// CI credentials.
#[derive(Debug, Default)]
pub struct DryRunHandler;

impl DryRunHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageHandler for DryRunHandler {
    async fn validate(&self, stage: &StageConfig) -> Result<StageValidation, HandlerError> {
        let mut errors = Vec::new();
        if stage.workflow.workflow.trim().is_empty() {
            errors.push("workflow name must not be empty".to_string());
        }
        if stage.workflow.repository.trim().is_empty() {
            errors.push("workflow repository must not be empty".to_string());
        }
        if errors.is_empty() {
            Ok(StageValidation::ok())
        } else {
            Ok(StageValidation::failed(errors))
        }
    }

    async fn execute(&self, stage: &StageConfig) -> Result<WorkflowOutcome, HandlerError> {
        let run_ref = format!(
            "{}:{}/{}@{}",
            stage.workflow.platform, stage.workflow.repository, stage.workflow.workflow,
            stage.workflow.git_ref
        );
        tracing::info!(stage_id = %stage.id, run_ref = %run_ref, "dry-run workflow dispatch");
        Ok(WorkflowOutcome::succeeded(run_ref))
    }
}
