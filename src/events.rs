// ABOUTME: Push-style status change events over a broadcast channel.
// ABOUTME: Subscribers observe deployment, stage, and rollback transitions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::pipeline::{DeploymentState, StageState};
use crate::rollback::RollbackState;
use crate::types::{DeploymentId, RollbackId, StageId};

/// A status transition somewhere in the pipeline.
///
/// Delivery is best-effort: the channel drops the oldest events for
/// subscribers that fall behind, so emitters are never blocked.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    DeploymentStatusChanged {
        deployment_id: DeploymentId,
        previous: DeploymentState,
        new: DeploymentState,
        timestamp: DateTime<Utc>,
    },
    StageStatusChanged {
        deployment_id: DeploymentId,
        stage_id: StageId,
        previous: StageState,
        new: StageState,
        timestamp: DateTime<Utc>,
    },
    RollbackStatusChanged {
        rollback_id: RollbackId,
        previous: RollbackState,
        new: RollbackState,
        timestamp: DateTime<Utc>,
    },
}

/// Fan-out bus for pipeline events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event. A send error only means there are no subscribers,
    /// which is fine.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn deployment_changed(
        &self,
        deployment_id: &DeploymentId,
        previous: DeploymentState,
        new: DeploymentState,
    ) {
        self.emit(PipelineEvent::DeploymentStatusChanged {
            deployment_id: deployment_id.clone(),
            previous,
            new,
            timestamp: Utc::now(),
        });
    }

    pub fn stage_changed(
        &self,
        deployment_id: &DeploymentId,
        stage_id: &StageId,
        previous: StageState,
        new: StageState,
    ) {
        self.emit(PipelineEvent::StageStatusChanged {
            deployment_id: deployment_id.clone(),
            stage_id: stage_id.clone(),
            previous,
            new,
            timestamp: Utc::now(),
        });
    }

    pub fn rollback_changed(
        &self,
        rollback_id: &RollbackId,
        previous: RollbackState,
        new: RollbackState,
    ) {
        self.emit(PipelineEvent::RollbackStatusChanged {
            rollback_id: rollback_id.clone(),
            previous,
            new,
            timestamp: Utc::now(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
