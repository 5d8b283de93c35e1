// ABOUTME: Aggregate counters for one deployment run.
// ABOUTME: Derived from stage results; successful + failed always equals executed.

use serde::Serialize;
use std::time::Duration;

use crate::types::StageId;

use super::result::StageResult;

/// Aggregate counters for one deployment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentMetrics {
    pub stages_executed: usize,
    pub successful_stages: usize,
    pub failed_stages: usize,
    #[serde(with = "humantime_serde")]
    pub total_duration: Duration,
    pub stages: Vec<StageMetrics>,
}

/// Per-stage slice of the metrics.
#[derive(Debug, Clone, Serialize)]
pub struct StageMetrics {
    pub stage_id: StageId,
    pub success: bool,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Retries are a handler concern; the core never retries, so this
    /// stays zero unless a handler reports otherwise.
    pub retry_count: u32,
}

impl DeploymentMetrics {
    pub fn from_results(results: &[StageResult], total_duration: Duration) -> Self {
        let stages: Vec<StageMetrics> = results
            .iter()
            .map(|r| StageMetrics {
                stage_id: r.stage_id.clone(),
                success: r.success,
                duration: (r.completed_at - r.started_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO),
                retry_count: 0,
            })
            .collect();

        Self {
            stages_executed: results.len(),
            successful_stages: results.iter().filter(|r| r.success).count(),
            failed_stages: results.iter().filter(|r| !r.success).count(),
            total_duration,
            stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::result::StageState;
    use chrono::Utc;

    fn result(id: &str, success: bool) -> StageResult {
        let now = Utc::now();
        StageResult {
            stage_id: StageId::new(id),
            stage_name: id.to_string(),
            success,
            state: if success {
                StageState::Succeeded
            } else {
                StageState::Failed
            },
            error: None,
            health_checks: Vec::new(),
            started_at: now,
            completed_at: now,
        }
    }

    #[test]
    fn counters_stay_consistent() {
        let results = vec![result("a", true), result("b", true), result("c", false)];
        let metrics = DeploymentMetrics::from_results(&results, Duration::from_secs(30));

        assert_eq!(metrics.stages_executed, 3);
        assert_eq!(metrics.successful_stages, 2);
        assert_eq!(metrics.failed_stages, 1);
        assert_eq!(
            metrics.successful_stages + metrics.failed_stages,
            metrics.stages_executed
        );
        assert_eq!(metrics.stages.len(), 3);
    }

    #[test]
    fn empty_run_yields_empty_metrics() {
        let metrics = DeploymentMetrics::from_results(&[], Duration::ZERO);
        assert_eq!(metrics.stages_executed, 0);
        assert_eq!(metrics.successful_stages, 0);
        assert_eq!(metrics.failed_stages, 0);
    }
}
