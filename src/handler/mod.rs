// ABOUTME: Stage handler contract for CI/CD platform adapters.
// ABOUTME: Validate prerequisites and execute a stage's delegated workflow.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{CiPlatform, StageConfig};

mod dispatch;

pub use dispatch::DryRunHandler;

/// Adapter to one CI/CD platform. Supplied from outside the core; the
/// pipeline only drives it through this trait.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Check whether the stage's prerequisites hold (workflow exists,
    /// credentials present, target reachable).
    async fn validate(&self, stage: &StageConfig) -> Result<StageValidation, HandlerError>;

    /// Perform the stage's work, e.g. trigger the CI workflow and await
    /// its terminal status.
    async fn execute(&self, stage: &StageConfig) -> Result<WorkflowOutcome, HandlerError>;
}

/// Result of a prerequisite check.
#[derive(Debug, Clone)]
pub struct StageValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl StageValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Terminal outcome of a delegated workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub success: bool,
    /// Platform-side run identifier or URL, when available.
    pub run_ref: Option<String>,
    pub message: Option<String>,
}

impl WorkflowOutcome {
    pub fn succeeded(run_ref: impl Into<String>) -> Self {
        Self {
            success: true,
            run_ref: Some(run_ref.into()),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            run_ref: None,
            message: Some(message.into()),
        }
    }
}

/// Errors from stage handlers.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("platform rejected request: {0}")]
    Rejected(String),

    #[error("platform unreachable: {0}")]
    Unreachable(String),

    #[error("handler error: {0}")]
    Other(String),
}

/// Registry of handlers keyed by CI platform.
///
/// A stage whose platform has no registered handler fails with a result,
/// not a panic; the executor handles the `None` case.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<CiPlatform, Arc<dyn StageHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, platform: CiPlatform, handler: Arc<dyn StageHandler>) {
        self.handlers.write().insert(platform, handler);
    }

    pub fn get(&self, platform: CiPlatform) -> Option<Arc<dyn StageHandler>> {
        self.handlers.read().get(&platform).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl StageHandler for NoopHandler {
        async fn validate(&self, _stage: &StageConfig) -> Result<StageValidation, HandlerError> {
            Ok(StageValidation::ok())
        }

        async fn execute(&self, _stage: &StageConfig) -> Result<WorkflowOutcome, HandlerError> {
            Ok(WorkflowOutcome::succeeded("run-1"))
        }
    }

    #[test]
    fn registry_returns_registered_handler() {
        let registry = HandlerRegistry::new();
        registry.register(CiPlatform::GithubActions, Arc::new(NoopHandler));

        assert!(registry.get(CiPlatform::GithubActions).is_some());
        assert!(registry.get(CiPlatform::Jenkins).is_none());
    }
}
