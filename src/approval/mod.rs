// ABOUTME: Pluggable approval gates for stages that require sign-off.
// ABOUTME: Auto-approval is an explicit policy choice, never a silent bypass.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

use crate::types::{DeploymentId, StageId};

/// What the executor asks a policy to decide on.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub deployment_id: DeploymentId,
    pub stage_id: StageId,
    pub stage_name: String,
}

/// An approval decision submitted by an actor.
#[derive(Debug, Clone)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub approver: String,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl ApprovalDecision {
    pub fn approve(approver: impl Into<String>) -> Self {
        Self {
            approved: true,
            approver: approver.into(),
            comments: None,
            decided_at: Utc::now(),
        }
    }

    pub fn reject(approver: impl Into<String>, comments: impl Into<String>) -> Self {
        Self {
            approved: false,
            approver: approver.into(),
            comments: Some(comments.into()),
            decided_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("no pending approval request for stage {0}")]
    NoPendingRequest(String),

    #[error("approval channel closed before a decision was made")]
    ChannelClosed,
}

/// Decides whether a gated stage may proceed. The executor blocks on
/// `decide` until a decision exists; bounding that wait is the caller's
/// job (stage timeout or cancellation).
#[async_trait]
pub trait ApprovalPolicy: Send + Sync {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError>;
}

/// Approves every gate immediately. For non-interactive runs only;
/// wiring this into a production pipeline is a deliberate choice the
/// operator makes, not a default.
pub struct AutoApprove {
    approver: String,
}

impl AutoApprove {
    pub fn new(approver: impl Into<String>) -> Self {
        Self {
            approver: approver.into(),
        }
    }
}

#[async_trait]
impl ApprovalPolicy for AutoApprove {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        Ok(ApprovalDecision::approve(self.approver.clone()))
    }
}

type PendingKey = (DeploymentId, StageId);

/// Interactive gate: `decide` parks the stage until some actor calls
/// [`ManualApprovals::submit`] for it.
#[derive(Default)]
pub struct ManualApprovals {
    pending: Mutex<HashMap<PendingKey, oneshot::Sender<ApprovalDecision>>>,
}

impl ManualApprovals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages currently waiting on a decision.
    pub fn pending(&self) -> Vec<(DeploymentId, StageId)> {
        self.pending.lock().keys().cloned().collect()
    }

    /// Submit a decision for a waiting stage.
    pub fn submit(
        &self,
        deployment_id: &DeploymentId,
        stage_id: &StageId,
        decision: ApprovalDecision,
    ) -> Result<(), ApprovalError> {
        let sender = self
            .pending
            .lock()
            .remove(&(deployment_id.clone(), stage_id.clone()))
            .ok_or_else(|| ApprovalError::NoPendingRequest(stage_id.to_string()))?;

        sender
            .send(decision)
            .map_err(|_| ApprovalError::ChannelClosed)
    }
}

#[async_trait]
impl ApprovalPolicy for ManualApprovals {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, ApprovalError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(
            (request.deployment_id.clone(), request.stage_id.clone()),
            tx,
        );

        rx.await.map_err(|_| ApprovalError::ChannelClosed)
    }
}
