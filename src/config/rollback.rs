// ABOUTME: Rollback policy configuration attached to a deployment.
// ABOUTME: Controls automatic rollback and its trigger conditions.

use serde::Deserialize;
use std::time::Duration;

/// Rollback policy for one deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct RollbackConfig {
    /// Automatically roll back when the pipeline fails.
    #[serde(default)]
    pub auto_rollback: bool,

    /// Explicit version to roll back to. When unset, the ledger picks
    /// the most recent eligible version for the environment.
    #[serde(default)]
    pub target_version: Option<String>,

    #[serde(default)]
    pub reason: Option<String>,

    /// Delay before a background auto-rollback starts, giving operators
    /// a window to observe the failure first.
    #[serde(default = "default_grace_period", with = "humantime_serde")]
    pub grace_period: Duration,

    #[serde(default)]
    pub triggers: RollbackTriggers,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            auto_rollback: false,
            target_version: None,
            reason: None,
            grace_period: default_grace_period(),
            triggers: RollbackTriggers::default(),
        }
    }
}

/// Conditions under which external monitoring should request a rollback.
/// The pipeline records these; it does not monitor them itself.
#[derive(Debug, Clone, Deserialize)]
pub struct RollbackTriggers {
    #[serde(default = "default_on_health_check_failure")]
    pub on_health_check_failure: bool,

    /// Error-rate percentage above which monitoring should trigger.
    #[serde(default)]
    pub error_rate_threshold: Option<f64>,
}

impl Default for RollbackTriggers {
    fn default() -> Self {
        Self {
            on_health_check_failure: true,
            error_rate_threshold: None,
        }
    }
}

fn default_grace_period() -> Duration {
    Duration::from_secs(5)
}

fn default_on_health_check_failure() -> bool {
    true
}
