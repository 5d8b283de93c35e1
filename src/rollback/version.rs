// ABOUTME: Version history records and rollback attempt outcomes.
// ABOUTME: At most one version is active per environment at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeploymentId, EnvironmentName, RollbackId};

/// One historically deployed artifact in one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentVersion {
    pub version: String,

    pub deployment_id: DeploymentId,

    pub environment: EnvironmentName,

    pub deployed_at: DateTime<Utc>,

    #[serde(default)]
    pub commit_ref: Option<String>,

    /// Whether this version currently serves the environment.
    #[serde(default, rename = "active")]
    pub is_active: bool,

    /// Whether this version is a valid rollback target.
    #[serde(default = "default_eligible", rename = "rollback_eligible")]
    pub is_rollback_eligible: bool,
}

fn default_eligible() -> bool {
    true
}

/// Lifecycle of one rollback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl std::fmt::Display for RollbackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one rollback attempt. Failures are encoded here, never
/// raised to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackResult {
    pub rollback_id: RollbackId,
    pub deployment_id: DeploymentId,
    pub success: bool,
    pub status: RollbackState,
    pub rolled_back_to: Option<String>,
    pub reason: String,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
