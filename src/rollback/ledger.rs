// ABOUTME: Version ledger recording deployed versions and executing rollbacks.
// ABOUTME: The version swap is serialized per environment to keep one active version.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::RollbackTriggers;
use crate::events::EventBus;
use crate::store::Repository;
use crate::types::{DeploymentId, EnvironmentName, RollbackId};

use super::{DeploymentVersion, RollbackResult, RollbackState};

type VersionStore = Arc<dyn Repository<String, DeploymentVersion>>;

/// Records deployed versions per environment and reactivates prior
/// versions on rollback.
///
/// Every mutation of the history goes through the environment's async
/// mutex, so two concurrent rollbacks for the same environment can never
/// both mark a version active.
pub struct VersionLedger {
    store: VersionStore,
    events: EventBus,
    env_locks: Mutex<HashMap<EnvironmentName, Arc<tokio::sync::Mutex<()>>>>,
    auto_triggers: RwLock<Option<RollbackTriggers>>,
}

impl VersionLedger {
    pub fn new(store: VersionStore, events: EventBus) -> Self {
        Self {
            store,
            events,
            env_locks: Mutex::new(HashMap::new()),
            auto_triggers: RwLock::new(None),
        }
    }

    /// Seed the ledger with known history, e.g. from the config file.
    pub fn seed(&self, versions: impl IntoIterator<Item = DeploymentVersion>) {
        for version in versions {
            self.store.put(version.version.clone(), version);
        }
    }

    /// Record a newly deployed version as the active one for its
    /// environment, deactivating whichever version was active before.
    pub async fn record_version(&self, version: DeploymentVersion) {
        let _guard = self.env_lock(&version.environment).lock_owned().await;

        if version.is_active {
            self.deactivate_current(&version.environment);
        }
        self.store.put(version.version.clone(), version);
    }

    /// Record policy for automatic triggering. The ledger does not
    /// monitor these conditions itself; external monitoring reads them.
    pub fn configure_auto_rollback(&self, triggers: RollbackTriggers) {
        *self.auto_triggers.write() = Some(triggers);
    }

    pub fn auto_rollback_triggers(&self) -> Option<RollbackTriggers> {
        self.auto_triggers.read().clone()
    }

    /// All rollback-eligible versions for an environment, most recent
    /// first.
    pub fn rollback_options(&self, environment: &EnvironmentName) -> Vec<DeploymentVersion> {
        let mut options: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|v| &v.environment == environment && v.is_rollback_eligible)
            .collect();
        options.sort_by(|a, b| b.deployed_at.cmp(&a.deployed_at));
        options
    }

    /// The version currently active in an environment, if any.
    pub fn active_version(&self, environment: &EnvironmentName) -> Option<DeploymentVersion> {
        self.store
            .list()
            .into_iter()
            .find(|v| &v.environment == environment && v.is_active)
    }

    /// Roll back to the most recently deployed, non-active, eligible
    /// version for the environment.
    pub async fn rollback(
        &self,
        deployment_id: &DeploymentId,
        environment: &EnvironmentName,
        reason: &str,
        cancel: &CancellationToken,
    ) -> RollbackResult {
        let attempt = Attempt::start(self, deployment_id, reason);
        let _guard = self.env_lock(environment).lock_owned().await;

        if cancel.is_cancelled() {
            return attempt.failed("rollback cancelled");
        }

        let target = self
            .rollback_options(environment)
            .into_iter()
            .find(|v| !v.is_active);

        match target {
            Some(target) => {
                self.swap_active(environment, &target.version);
                attempt.succeeded(target.version)
            }
            None => attempt.failed(format!(
                "no suitable version to roll back to in environment '{environment}'"
            )),
        }
    }

    /// Roll back to an explicitly named version.
    pub async fn rollback_to_version(
        &self,
        deployment_id: &DeploymentId,
        environment: &EnvironmentName,
        target_version: &str,
        reason: &str,
        cancel: &CancellationToken,
    ) -> RollbackResult {
        let attempt = Attempt::start(self, deployment_id, reason);
        let _guard = self.env_lock(environment).lock_owned().await;

        if cancel.is_cancelled() {
            return attempt.failed("rollback cancelled");
        }

        let target = match self.store.get(&target_version.to_string()) {
            Some(v) => v,
            None => {
                return attempt.failed(format!("version '{target_version}' not found"));
            }
        };

        if &target.environment != environment {
            return attempt.failed(format!(
                "version '{target_version}' belongs to environment '{}', not '{environment}'",
                target.environment
            ));
        }

        if !target.is_rollback_eligible {
            return attempt.failed(format!(
                "version '{target_version}' is not rollback-eligible"
            ));
        }

        self.swap_active(environment, &target.version);
        attempt.succeeded(target.version)
    }

    /// Flip the active flag from the current version to the target.
    /// Callers must hold the environment lock.
    fn swap_active(&self, environment: &EnvironmentName, target_version: &str) {
        self.deactivate_current(environment);
        self.store
            .update(&target_version.to_string(), &mut |v| v.is_active = true);
    }

    fn deactivate_current(&self, environment: &EnvironmentName) {
        if let Some(current) = self.active_version(environment) {
            self.store
                .update(&current.version, &mut |v| v.is_active = false);
        }
    }

    fn env_lock(&self, environment: &EnvironmentName) -> Arc<tokio::sync::Mutex<()>> {
        self.env_locks
            .lock()
            .entry(environment.clone())
            .or_default()
            .clone()
    }
}

/// One rollback attempt in flight; owns the ID, timing, and event
/// emission for its status transitions.
struct Attempt<'a> {
    ledger: &'a VersionLedger,
    rollback_id: RollbackId,
    deployment_id: DeploymentId,
    reason: String,
    started_at: chrono::DateTime<Utc>,
}

impl<'a> Attempt<'a> {
    fn start(ledger: &'a VersionLedger, deployment_id: &DeploymentId, reason: &str) -> Self {
        let rollback_id = RollbackId::generate();
        ledger
            .events
            .rollback_changed(&rollback_id, RollbackState::Pending, RollbackState::InProgress);

        Self {
            ledger,
            rollback_id,
            deployment_id: deployment_id.clone(),
            reason: reason.to_string(),
            started_at: Utc::now(),
        }
    }

    fn succeeded(self, rolled_back_to: String) -> RollbackResult {
        self.ledger.events.rollback_changed(
            &self.rollback_id,
            RollbackState::InProgress,
            RollbackState::Succeeded,
        );
        tracing::info!(
            rollback_id = %self.rollback_id,
            deployment_id = %self.deployment_id,
            version = %rolled_back_to,
            "rollback succeeded"
        );

        RollbackResult {
            rollback_id: self.rollback_id,
            deployment_id: self.deployment_id,
            success: true,
            status: RollbackState::Succeeded,
            rolled_back_to: Some(rolled_back_to),
            reason: self.reason,
            error: None,
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }

    fn failed(self, error: impl Into<String>) -> RollbackResult {
        let error = error.into();
        self.ledger.events.rollback_changed(
            &self.rollback_id,
            RollbackState::InProgress,
            RollbackState::Failed,
        );
        tracing::warn!(
            rollback_id = %self.rollback_id,
            deployment_id = %self.deployment_id,
            error = %error,
            "rollback failed"
        );

        RollbackResult {
            rollback_id: self.rollback_id,
            deployment_id: self.deployment_id,
            success: false,
            status: RollbackState::Failed,
            rolled_back_to: None,
            reason: self.reason,
            error: Some(error),
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }
}
