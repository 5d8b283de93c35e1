// ABOUTME: Health probe contract and the per-stage endpoint check driver.
// ABOUTME: Probes run concurrently; a stage is healthy only if every endpoint is.

mod http;

pub use http::HttpProbe;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::HealthCheckConfig;

/// Issues one bounded probe against an endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, endpoint: &str, timeout: Duration) -> Result<ProbeResponse, ProbeError>;
}

/// What a probe observed.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe cancelled")]
    Cancelled,
}

/// Outcome of probing one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub endpoint: String,
    pub healthy: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    #[serde(with = "humantime_serde")]
    pub response_time: Duration,
    pub checked_at: DateTime<Utc>,
}

/// Probe every configured endpoint once, concurrently.
///
/// Each probe is bounded by the configured timeout and by `cancel`.
/// An endpoint is healthy iff its observed status code is in the
/// accepted set; errors and timeouts count as unhealthy.
pub async fn check_endpoints(
    probe: &dyn HealthProbe,
    config: &HealthCheckConfig,
    cancel: &CancellationToken,
) -> Vec<HealthCheckResult> {
    let checks = config
        .endpoints
        .iter()
        .map(|endpoint| check_one(probe, config, endpoint, cancel));

    futures::future::join_all(checks).await
}

pub fn all_healthy(results: &[HealthCheckResult]) -> bool {
    results.iter().all(|r| r.healthy)
}

async fn check_one(
    probe: &dyn HealthProbe,
    config: &HealthCheckConfig,
    endpoint: &str,
    cancel: &CancellationToken,
) -> HealthCheckResult {
    let started = Instant::now();

    let outcome = tokio::select! {
        _ = cancel.cancelled() => Err(ProbeError::Cancelled),
        res = tokio::time::timeout(config.timeout, probe.probe(endpoint, config.timeout)) => {
            match res {
                Ok(inner) => inner,
                Err(_) => Err(ProbeError::Timeout(config.timeout)),
            }
        }
    };

    let response_time = started.elapsed();

    match outcome {
        Ok(response) => HealthCheckResult {
            endpoint: endpoint.to_string(),
            healthy: config.accepts(response.status),
            status_code: Some(response.status),
            error: if config.accepts(response.status) {
                None
            } else {
                Some(format!("unexpected status code {}", response.status))
            },
            response_time,
            checked_at: Utc::now(),
        },
        Err(e) => HealthCheckResult {
            endpoint: endpoint.to_string(),
            healthy: false,
            status_code: None,
            error: Some(e.to_string()),
            response_time,
            checked_at: Utc::now(),
        },
    }
}
