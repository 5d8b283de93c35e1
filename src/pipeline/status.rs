// ABOUTME: Deployment-level status: the state machine and its runtime record.
// ABOUTME: Progress percentage is derived from state, never set directly.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{DeploymentId, StageId};

/// Deployment lifecycle states.
///
/// ```text
/// Queued --validate ok--> InProgress --all stages ok--> Succeeded
/// Queued --validate fail--> Failed
/// InProgress --any stage fails--> Failed
/// Failed --rollback--> RollingBack --success--> RolledBack
/// RollingBack --failure--> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Queued,
    InProgress,
    Succeeded,
    Failed,
    RollingBack,
    RolledBack,
    /// Sentinel for status queries about unknown deployment ids.
    NotFound,
}

impl DeploymentState {
    /// Whether the state machine allows moving to `next` from here.
    pub fn can_transition_to(self, next: DeploymentState) -> bool {
        use DeploymentState::*;
        matches!(
            (self, next),
            (Queued, InProgress)
                | (Queued, Failed)
                | (InProgress, Succeeded)
                | (InProgress, Failed)
                | (Failed, RollingBack)
                | (RollingBack, RolledBack)
                | (RollingBack, Failed)
        )
    }

    /// Informational completion percentage for presentation.
    pub fn progress_percentage(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::InProgress => 50,
            Self::RollingBack => 75,
            Self::Succeeded | Self::RolledBack => 100,
            Self::Failed | Self::NotFound => 0,
        }
    }

    pub fn is_terminal_success(self) -> bool {
        matches!(self, Self::Succeeded | Self::RolledBack)
    }
}

impl std::fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::RollingBack => write!(f, "rolling-back"),
            Self::RolledBack => write!(f, "rolled-back"),
            Self::NotFound => write!(f, "not-found"),
        }
    }
}

/// Mutable runtime state of one deployment. Owned by the orchestrator's
/// status store; everything here is process-local and lost on restart.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentStatus {
    pub deployment_id: DeploymentId,
    pub state: DeploymentState,
    pub progress_percentage: u8,
    pub current_stage: Option<StageId>,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl DeploymentStatus {
    pub fn queued(deployment_id: DeploymentId) -> Self {
        let now = Utc::now();
        Self {
            deployment_id,
            state: DeploymentState::Queued,
            progress_percentage: DeploymentState::Queued.progress_percentage(),
            current_stage: None,
            message: "queued".to_string(),
            started_at: now,
            last_updated: now,
        }
    }

    /// Sentinel returned for unknown deployment ids.
    pub fn not_found(deployment_id: DeploymentId) -> Self {
        let now = Utc::now();
        Self {
            deployment_id,
            state: DeploymentState::NotFound,
            progress_percentage: 0,
            current_stage: None,
            message: "no such deployment".to_string(),
            started_at: now,
            last_updated: now,
        }
    }

    /// Apply a transition, keeping the derived progress in sync.
    /// Illegal transitions are logged and ignored rather than applied.
    pub fn transition(&mut self, next: DeploymentState, message: impl Into<String>) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                deployment_id = %self.deployment_id,
                from = %self.state,
                to = %next,
                "ignoring illegal deployment state transition"
            );
            return false;
        }

        self.state = next;
        self.progress_percentage = next.progress_percentage();
        self.message = message.into();
        self.last_updated = Utc::now();
        true
    }
}
