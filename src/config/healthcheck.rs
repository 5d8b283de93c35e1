// ABOUTME: Stage health check configuration.
// ABOUTME: Defines HTTP endpoint probes with accepted status codes and timeouts.

use serde::Deserialize;
use std::time::Duration;

/// Health validation for a stage. Each endpoint gets a single bounded
/// probe after the stage's work completes; the stage is healthy only if
/// every endpoint reports an accepted status code.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Endpoint URLs to probe, e.g. "http://payments.staging.internal/healthz".
    pub endpoints: Vec<String>,

    /// Status codes counted as healthy.
    #[serde(default = "default_accepted_status")]
    pub accepted_status: Vec<u16>,

    /// Per-probe timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl HealthCheckConfig {
    pub fn accepts(&self, status: u16) -> bool {
        self.accepted_status.contains(&status)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_accepted_status() -> Vec<u16> {
    vec![200]
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}
