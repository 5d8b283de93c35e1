// ABOUTME: Top-level pipeline entry point: validate, run stages, finalize, auto-rollback.
// ABOUTME: Owns the live status and metrics stores, keyed by deployment id.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::approval::ApprovalPolicy;
use crate::config::{DeploymentConfig, StageConfig};
use crate::events::{EventBus, PipelineEvent};
use crate::handler::HandlerRegistry;
use crate::health::HealthProbe;
use crate::rollback::{DeploymentVersion, RollbackResult, VersionLedger};
use crate::store::{InMemoryRepository, Repository};
use crate::types::{DeploymentId, EnvironmentName};

use super::executor::{StageContext, StageExecutor};
use super::metrics::DeploymentMetrics;
use super::result::DeploymentResult;
use super::sequencer::StageSequencer;
use super::status::{DeploymentState, DeploymentStatus};
use super::validate;

type StatusStore = Arc<dyn Repository<DeploymentId, DeploymentStatus>>;
type MetricsStore = Arc<dyn Repository<DeploymentId, DeploymentMetrics>>;

/// Drives whole deployments: validation, the stage sequence, status and
/// metrics bookkeeping, and rollback (explicit or automatic).
///
/// Cloning is cheap; clones share the same stores, ledger, and event
/// bus, so multiple deployments can run concurrently.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    statuses: StatusStore,
    metrics: MetricsStore,
    sequencer: Arc<StageSequencer>,
    ledger: Arc<VersionLedger>,
    events: EventBus,
}

impl PipelineOrchestrator {
    pub fn new(
        handlers: Arc<HandlerRegistry>,
        approvals: Arc<dyn ApprovalPolicy>,
        probe: Arc<dyn HealthProbe>,
        ledger: Arc<VersionLedger>,
        events: EventBus,
    ) -> Self {
        let executor = StageExecutor::new(handlers, approvals, probe, events.clone());

        Self {
            statuses: Arc::new(InMemoryRepository::new()),
            metrics: Arc::new(InMemoryRepository::new()),
            sequencer: Arc::new(StageSequencer::new(executor)),
            ledger,
            events,
        }
    }

    /// Execute one deployment end to end. Expected failures come back
    /// inside the `DeploymentResult`; this never returns an error for
    /// them.
    pub async fn execute_pipeline(
        &self,
        config: &DeploymentConfig,
        cancel: CancellationToken,
    ) -> DeploymentResult {
        // Re-running with the same id overwrites the previous record.
        self.statuses
            .put(config.id.clone(), DeploymentStatus::queued(config.id.clone()));
        self.metrics
            .put(config.id.clone(), DeploymentMetrics::default());

        let report = validate::validate(config);
        for warning in &report.warnings {
            tracing::warn!(deployment_id = %config.id, "{warning}");
        }
        if !report.is_valid() {
            let message = format!("validation failed: {}", report.error_summary());
            self.set_state(&config.id, DeploymentState::Failed, &message);
            return DeploymentResult {
                deployment_id: config.id.clone(),
                success: false,
                state: DeploymentState::Failed,
                message,
                stage_results: Vec::new(),
                metrics: DeploymentMetrics::default(),
            };
        }

        self.set_state(&config.id, DeploymentState::InProgress, "running stages");

        // Overall pipeline bound: a timer cancels the stage run when the
        // configured timeout elapses. Zero means unbounded.
        let run_cancel = cancel.child_token();
        let timer = (!config.timeout.is_zero()).then(|| {
            let deadline_cancel = run_cancel.clone();
            let timeout = config.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                deadline_cancel.cancel();
            })
        });

        let ctx = StageContext {
            deployment_id: config.id.clone(),
            cancel: run_cancel,
        };
        let stages: Vec<StageConfig> = config.stages.iter().cloned().collect();
        let started = Instant::now();

        let results = self
            .sequencer
            .run_all(&stages, &ctx, |stage_id| {
                self.statuses.update(&config.id, &mut |status| {
                    status.current_stage = Some(stage_id.clone());
                    status.last_updated = Utc::now();
                });
            })
            .await;

        if let Some(timer) = timer {
            timer.abort();
        }

        let metrics = DeploymentMetrics::from_results(&results, started.elapsed());
        self.metrics.put(config.id.clone(), metrics.clone());

        let all_succeeded = results.iter().all(|r| r.success);
        let message = if all_succeeded {
            format!("all {} stage(s) succeeded", results.len())
        } else {
            results
                .iter()
                .rev()
                .find_map(|r| r.error.clone())
                .unwrap_or_else(|| "a stage failed".to_string())
        };

        if all_succeeded {
            self.set_state(&config.id, DeploymentState::Succeeded, &message);
            self.record_deployed_version(config).await;
        } else {
            self.set_state(&config.id, DeploymentState::Failed, &message);
            if config.auto_rollback_enabled() {
                self.schedule_auto_rollback(config);
            }
        }

        DeploymentResult {
            deployment_id: config.id.clone(),
            success: all_succeeded,
            state: if all_succeeded {
                DeploymentState::Succeeded
            } else {
                DeploymentState::Failed
            },
            message,
            stage_results: results,
            metrics,
        }
    }

    /// Explicit, caller-invoked rollback of a (failed) deployment.
    pub async fn rollback(
        &self,
        config: &DeploymentConfig,
        cancel: &CancellationToken,
    ) -> RollbackResult {
        let rollback = config.rollback.as_ref();
        let reason = rollback
            .and_then(|r| r.reason.clone())
            .unwrap_or_else(|| "manual rollback".to_string());
        let target = rollback.and_then(|r| r.target_version.clone());

        self.run_rollback(
            &config.id,
            &config.environment,
            target.as_deref(),
            &reason,
            cancel,
        )
        .await
    }

    /// Current status for a deployment; a NotFound sentinel for unknown
    /// ids, never an error.
    pub fn get_status(&self, deployment_id: &DeploymentId) -> DeploymentStatus {
        self.statuses
            .get(deployment_id)
            .unwrap_or_else(|| DeploymentStatus::not_found(deployment_id.clone()))
    }

    pub fn get_metrics(&self, deployment_id: &DeploymentId) -> Option<DeploymentMetrics> {
        self.metrics.get(deployment_id)
    }

    /// All deployments this process has seen.
    pub fn statuses(&self) -> Vec<DeploymentStatus> {
        self.statuses.list()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Fire-and-forget compensation after a failed run. Never blocks
    /// the caller; the outcome is observable on the event bus and its
    /// failures are only logged.
    fn schedule_auto_rollback(&self, config: &DeploymentConfig) {
        let Some(rollback) = config.rollback.clone() else {
            return;
        };
        let orchestrator = self.clone();
        let deployment_id = config.id.clone();
        let environment = config.environment.clone();

        tokio::spawn(async move {
            tokio::time::sleep(rollback.grace_period).await;

            let result = orchestrator
                .run_rollback(
                    &deployment_id,
                    &environment,
                    None,
                    "deployment failed",
                    &CancellationToken::new(),
                )
                .await;

            if !result.success {
                tracing::warn!(
                    deployment_id = %deployment_id,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "automatic rollback failed"
                );
            }
        });
    }

    /// Shared rollback path: drives the deployment state through
    /// RollingBack and delegates the version swap to the ledger.
    async fn run_rollback(
        &self,
        deployment_id: &DeploymentId,
        environment: &EnvironmentName,
        target_version: Option<&str>,
        reason: &str,
        cancel: &CancellationToken,
    ) -> RollbackResult {
        self.set_state(
            deployment_id,
            DeploymentState::RollingBack,
            &format!("rolling back: {reason}"),
        );

        let result = match target_version {
            Some(version) => {
                self.ledger
                    .rollback_to_version(deployment_id, environment, version, reason, cancel)
                    .await
            }
            None => {
                self.ledger
                    .rollback(deployment_id, environment, reason, cancel)
                    .await
            }
        };

        if result.success {
            let version = result.rolled_back_to.as_deref().unwrap_or("unknown");
            self.set_state(
                deployment_id,
                DeploymentState::RolledBack,
                &format!("rolled back to {version}"),
            );
        } else {
            self.set_state(
                deployment_id,
                DeploymentState::Failed,
                &format!(
                    "rollback failed: {}",
                    result.error.as_deref().unwrap_or("unknown")
                ),
            );
        }

        result
    }

    /// A successful run extends the version history and becomes the
    /// active version for its environment.
    async fn record_deployed_version(&self, config: &DeploymentConfig) {
        self.ledger
            .record_version(DeploymentVersion {
                version: config.version.clone(),
                deployment_id: config.id.clone(),
                environment: config.environment.clone(),
                deployed_at: Utc::now(),
                commit_ref: None,
                is_active: true,
                is_rollback_eligible: true,
            })
            .await;
    }

    fn set_state(&self, deployment_id: &DeploymentId, next: DeploymentState, message: &str) {
        let mut previous = None;
        self.statuses.update(deployment_id, &mut |status| {
            let from = status.state;
            if status.transition(next, message) {
                previous = Some(from);
            }
        });

        if let Some(from) = previous {
            self.events.deployment_changed(deployment_id, from, next);
        }
    }
}
