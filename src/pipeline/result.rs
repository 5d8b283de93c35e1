// ABOUTME: Stage and deployment outcome types.
// ABOUTME: Failures are encoded here as data; execution never throws for them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::health::HealthCheckResult;
use crate::types::{DeploymentId, StageId};

use super::metrics::DeploymentMetrics;
use super::status::DeploymentState;

/// Lifecycle states of one stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    AwaitingApproval,
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::AwaitingApproval => write!(f, "awaiting-approval"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one stage execution. A `success == false` result halts
/// the pipeline unless the stage opted into `continue_on_failure`.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage_id: StageId,
    pub stage_name: String,
    pub success: bool,
    pub state: StageState,
    pub error: Option<String>,
    pub health_checks: Vec<HealthCheckResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Final answer from `execute_pipeline`: terminal status plus the
/// per-stage record of what happened.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    pub deployment_id: DeploymentId,
    pub success: bool,
    pub state: DeploymentState,
    pub message: String,
    pub stage_results: Vec<StageResult>,
    pub metrics: DeploymentMetrics,
}
