// ABOUTME: Orders stages and drives the executor over them, fail-fast.
// ABOUTME: A failing stage halts everything after it unless it opted out.

use crate::config::StageConfig;
use crate::types::StageId;

use super::executor::{StageContext, StageExecutor};
use super::result::StageResult;

/// Runs stages strictly sequentially in ascending `order`. Stages are
/// assumed to have ordering dependencies (dev before staging before
/// production); there is no fan-out of independent stages.
pub struct StageSequencer {
    executor: StageExecutor,
}

impl StageSequencer {
    pub fn new(executor: StageExecutor) -> Self {
        Self { executor }
    }

    /// Execute all stages in order, stopping at the first failure.
    /// Returns the partial or complete list of results. `on_stage_start`
    /// fires as each stage begins, letting the caller track the current
    /// stage.
    pub async fn run_all<F>(
        &self,
        stages: &[StageConfig],
        ctx: &StageContext,
        mut on_stage_start: F,
    ) -> Vec<StageResult>
    where
        F: FnMut(&StageId),
    {
        let mut ordered: Vec<&StageConfig> = stages.iter().collect();
        // Stable sort: ties keep their position in the original list.
        ordered.sort_by_key(|s| s.order);

        let mut results = Vec::with_capacity(ordered.len());

        for stage in ordered {
            on_stage_start(&stage.id);
            tracing::info!(
                deployment_id = %ctx.deployment_id,
                stage_id = %stage.id,
                order = stage.order,
                "running stage"
            );

            let result = self.executor.execute(stage, ctx).await;
            let halt = !result.success && !stage.continue_on_failure;

            if !result.success && stage.continue_on_failure {
                tracing::warn!(
                    stage_id = %stage.id,
                    "stage failed but is marked continue_on_failure; proceeding"
                );
            }

            results.push(result);

            if halt {
                break;
            }
        }

        results
    }
}
