// ABOUTME: Shared test fixtures: scripted stage handlers, canned health probes,
// ABOUTME: and config builders for pipeline integration tests.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use async_trait::async_trait;
use nonempty::NonEmpty;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use convoy::approval::AutoApprove;
use convoy::config::{
    CiPlatform, DeploymentConfig, HealthCheckConfig, RollbackConfig, StageConfig, WorkflowRef,
};
use convoy::events::EventBus;
use convoy::handler::{
    HandlerError, HandlerRegistry, StageHandler, StageValidation, WorkflowOutcome,
};
use convoy::health::{HealthProbe, ProbeError, ProbeResponse};
use convoy::pipeline::PipelineOrchestrator;
use convoy::rollback::{DeploymentVersion, VersionLedger};
use convoy::store::InMemoryRepository;
use convoy::types::{DeploymentId, EnvironmentName, StageId};

/// Handler that succeeds or fails per stage id and records the order in
/// which stages ran.
pub struct ScriptedHandler {
    failures: Vec<String>,
    pub executed: Mutex<Vec<String>>,
}

impl ScriptedHandler {
    pub fn all_pass() -> Self {
        Self::failing(&[])
    }

    /// Stages whose id is listed fail at the execution gate.
    pub fn failing(stage_ids: &[&str]) -> Self {
        Self {
            failures: stage_ids.iter().map(|s| s.to_string()).collect(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed_ids(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl StageHandler for ScriptedHandler {
    async fn validate(&self, _stage: &StageConfig) -> Result<StageValidation, HandlerError> {
        Ok(StageValidation::ok())
    }

    async fn execute(&self, stage: &StageConfig) -> Result<WorkflowOutcome, HandlerError> {
        self.executed.lock().push(stage.id.as_str().to_string());
        if self.failures.iter().any(|id| id == stage.id.as_str()) {
            Ok(WorkflowOutcome::failed("workflow run failed"))
        } else {
            Ok(WorkflowOutcome::succeeded(format!("run-{}", stage.id)))
        }
    }
}

/// Probe answering with a canned status per endpoint; unknown endpoints
/// get 200.
pub struct CannedProbe {
    statuses: HashMap<String, u16>,
}

impl CannedProbe {
    pub fn healthy() -> Self {
        Self {
            statuses: HashMap::new(),
        }
    }

    pub fn with_status(endpoint: &str, status: u16) -> Self {
        let mut statuses = HashMap::new();
        statuses.insert(endpoint.to_string(), status);
        Self { statuses }
    }
}

#[async_trait]
impl HealthProbe for CannedProbe {
    async fn probe(&self, endpoint: &str, _timeout: Duration) -> Result<ProbeResponse, ProbeError> {
        let status = self.statuses.get(endpoint).copied().unwrap_or(200);
        Ok(ProbeResponse { status })
    }
}

pub fn environment(name: &str) -> EnvironmentName {
    EnvironmentName::new(name).unwrap()
}

pub fn stage(id: &str, order: u32) -> StageConfig {
    StageConfig {
        id: StageId::new(id),
        name: format!("Stage {id}"),
        order,
        environment: environment("production"),
        requires_approval: false,
        continue_on_failure: false,
        workflow: WorkflowRef {
            platform: CiPlatform::GithubActions,
            workflow: "deploy.yml".to_string(),
            repository: "acme/app".to_string(),
            git_ref: "main".to_string(),
        },
        health_check: None,
        timeout: None,
    }
}

pub fn stage_with_health(id: &str, order: u32, endpoints: &[&str]) -> StageConfig {
    let mut config = stage(id, order);
    config.health_check = Some(HealthCheckConfig {
        enabled: true,
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        accepted_status: vec![200],
        timeout: Duration::from_secs(5),
    });
    config
}

pub fn deployment(id: &str, version: &str, stages: Vec<StageConfig>) -> DeploymentConfig {
    DeploymentConfig {
        id: DeploymentId::new(id),
        name: id.to_string(),
        version: version.to_string(),
        environment: environment("production"),
        stages: NonEmpty::from_vec(stages).unwrap(),
        rollback: None,
        timeout: Duration::from_secs(3600),
        versions: Vec::new(),
    }
}

pub fn auto_rollback(grace: Duration) -> RollbackConfig {
    RollbackConfig {
        auto_rollback: true,
        grace_period: grace,
        ..RollbackConfig::default()
    }
}

pub fn version(version: &str, environment_name: &str, active: bool) -> DeploymentVersion {
    DeploymentVersion {
        version: version.to_string(),
        deployment_id: DeploymentId::new("app"),
        environment: environment(environment_name),
        deployed_at: chrono::Utc::now(),
        commit_ref: None,
        is_active: active,
        is_rollback_eligible: true,
    }
}

/// Build a fully wired orchestrator around the given handler and probe.
pub fn orchestrator(
    handler: Arc<dyn StageHandler>,
    probe: Arc<dyn HealthProbe>,
) -> (PipelineOrchestrator, Arc<VersionLedger>) {
    let handlers = Arc::new(HandlerRegistry::new());
    for platform in CiPlatform::ALL {
        handlers.register(platform, handler.clone());
    }

    let events = EventBus::default();
    let ledger = Arc::new(VersionLedger::new(
        Arc::new(InMemoryRepository::new()),
        events.clone(),
    ));

    let orchestrator = PipelineOrchestrator::new(
        handlers,
        Arc::new(AutoApprove::new("tests")),
        probe,
        ledger.clone(),
        events,
    );
    (orchestrator, ledger)
}
