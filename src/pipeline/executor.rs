// ABOUTME: Executes one stage: prerequisites, approval gate, delegated work, health gates.
// ABOUTME: Every failure is converted into a failed StageResult, never propagated.

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::approval::{ApprovalPolicy, ApprovalRequest};
use crate::config::StageConfig;
use crate::events::EventBus;
use crate::handler::{HandlerRegistry, WorkflowOutcome};
use crate::health::{self, HealthCheckResult, HealthProbe};
use crate::types::DeploymentId;

use super::result::{StageResult, StageState};

/// Per-deployment context threaded through stage execution.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub deployment_id: DeploymentId,
    pub cancel: CancellationToken,
}

impl StageContext {
    pub fn new(deployment_id: DeploymentId) -> Self {
        Self {
            deployment_id,
            cancel: CancellationToken::new(),
        }
    }
}

/// Runs a single stage through its hard gates, in order: prerequisite
/// validation, approval, delegated execution, health validation. The
/// first gate that fails stops the stage; retries, if any, are the
/// handler's business, never this layer's.
pub struct StageExecutor {
    handlers: Arc<HandlerRegistry>,
    approvals: Arc<dyn ApprovalPolicy>,
    probe: Arc<dyn HealthProbe>,
    events: EventBus,
}

impl StageExecutor {
    pub fn new(
        handlers: Arc<HandlerRegistry>,
        approvals: Arc<dyn ApprovalPolicy>,
        probe: Arc<dyn HealthProbe>,
        events: EventBus,
    ) -> Self {
        Self {
            handlers,
            approvals,
            probe,
            events,
        }
    }

    pub async fn execute(&self, stage: &StageConfig, ctx: &StageContext) -> StageResult {
        let mut run = StageRun::start(stage, ctx, &self.events);

        if ctx.cancel.is_cancelled() {
            return run.fail("stage cancelled");
        }

        let handler = match self.handlers.get(stage.workflow.platform) {
            Some(handler) => handler,
            None => {
                return run.fail(format!(
                    "no handler registered for platform '{}'",
                    stage.workflow.platform
                ));
            }
        };

        // Gate 1: prerequisites.
        match handler.validate(stage).await {
            Ok(validation) if validation.valid => {}
            Ok(validation) => {
                return run.fail(format!(
                    "stage validation failed: {}",
                    validation.errors.join("; ")
                ));
            }
            Err(e) => return run.fail(format!("stage validation failed: {e}")),
        }

        // Gate 2: approval.
        if stage.requires_approval {
            run.transition(StageState::AwaitingApproval);

            let request = ApprovalRequest {
                deployment_id: ctx.deployment_id.clone(),
                stage_id: stage.id.clone(),
                stage_name: stage.name.clone(),
            };

            let decision = tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    return run.fail("stage cancelled while awaiting approval");
                }
                decision = self.approvals.decide(&request) => decision,
            };

            match decision {
                Ok(decision) if decision.approved => {
                    tracing::info!(
                        stage_id = %stage.id,
                        approver = %decision.approver,
                        "stage approved"
                    );
                    run.transition(StageState::Running);
                }
                Ok(decision) => {
                    let comments = decision.comments.unwrap_or_default();
                    return run.fail(format!(
                        "approval rejected by {}: {comments}",
                        decision.approver
                    ));
                }
                Err(e) => return run.fail(format!("approval gate failed: {e}")),
            }
        }

        // Gate 3: delegated execution, bounded by the stage timeout.
        let outcome = self.run_delegate(&*handler, stage, ctx).await;
        match outcome {
            Ok(WorkflowOutcome { success: true, run_ref, .. }) => {
                if let Some(run_ref) = run_ref {
                    tracing::debug!(stage_id = %stage.id, run = %run_ref, "workflow finished");
                }
            }
            Ok(WorkflowOutcome { message, .. }) => {
                return run.fail(
                    message.unwrap_or_else(|| "workflow reported failure".to_string()),
                );
            }
            Err(message) => return run.fail(message),
        }

        // Gate 4: health validation.
        if let Some(health_check) = stage.health_check.as_ref().filter(|hc| hc.enabled) {
            let results = health::check_endpoints(&*self.probe, health_check, &ctx.cancel).await;
            let healthy = health::all_healthy(&results);
            let unhealthy = results.iter().filter(|r| !r.healthy).count();
            run.health_checks = results;

            if !healthy {
                let total = run.health_checks.len();
                return run.fail(format!(
                    "health validation failed: {unhealthy} of {total} endpoint(s) unhealthy"
                ));
            }
        }

        run.succeed()
    }

    /// Invoke the handler's execute, converting panic-free errors,
    /// timeouts, and cancellation into failure messages.
    async fn run_delegate(
        &self,
        handler: &dyn crate::handler::StageHandler,
        stage: &StageConfig,
        ctx: &StageContext,
    ) -> Result<WorkflowOutcome, String> {
        let work = handler.execute(stage);

        let outcome = match stage.timeout {
            Some(timeout) => {
                tokio::select! {
                    _ = ctx.cancel.cancelled() => return Err("stage cancelled".to_string()),
                    res = tokio::time::timeout(timeout, work) => match res {
                        Ok(inner) => inner,
                        Err(_) => {
                            return Err(format!("stage timed out after {timeout:?}"));
                        }
                    },
                }
            }
            None => {
                tokio::select! {
                    _ = ctx.cancel.cancelled() => return Err("stage cancelled".to_string()),
                    res = work => res,
                }
            }
        };

        outcome.map_err(|e| format!("stage execution failed: {e}"))
    }
}

/// Book-keeping for one stage execution: timing, current state, and
/// event emission on every transition.
struct StageRun<'a> {
    stage: &'a StageConfig,
    ctx: &'a StageContext,
    events: &'a EventBus,
    state: StageState,
    health_checks: Vec<HealthCheckResult>,
    started_at: chrono::DateTime<Utc>,
}

impl<'a> StageRun<'a> {
    fn start(stage: &'a StageConfig, ctx: &'a StageContext, events: &'a EventBus) -> Self {
        let mut run = Self {
            stage,
            ctx,
            events,
            state: StageState::Pending,
            health_checks: Vec::new(),
            started_at: Utc::now(),
        };
        run.transition(StageState::Running);
        run
    }

    fn transition(&mut self, next: StageState) {
        self.events
            .stage_changed(&self.ctx.deployment_id, &self.stage.id, self.state, next);
        self.state = next;
    }

    fn succeed(mut self) -> StageResult {
        self.transition(StageState::Succeeded);
        StageResult {
            stage_id: self.stage.id.clone(),
            stage_name: self.stage.name.clone(),
            success: true,
            state: StageState::Succeeded,
            error: None,
            health_checks: self.health_checks,
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }

    fn fail(mut self, error: impl Into<String>) -> StageResult {
        let error = error.into();
        self.transition(StageState::Failed);
        tracing::warn!(
            deployment_id = %self.ctx.deployment_id,
            stage_id = %self.stage.id,
            error = %error,
            "stage failed"
        );

        StageResult {
            stage_id: self.stage.id.clone(),
            stage_name: self.stage.name.clone(),
            success: false,
            state: StageState::Failed,
            error: Some(error),
            health_checks: self.health_checks,
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalDecision, ApprovalError, AutoApprove};
    use crate::handler::{HandlerRegistry, StageHandler, StageValidation};
    use crate::health::HttpProbe;
    use async_trait::async_trait;

    struct PassingHandler;

    #[async_trait]
    impl StageHandler for PassingHandler {
        async fn validate(
            &self,
            _stage: &StageConfig,
        ) -> Result<StageValidation, crate::handler::HandlerError> {
            Ok(StageValidation::ok())
        }

        async fn execute(
            &self,
            _stage: &StageConfig,
        ) -> Result<WorkflowOutcome, crate::handler::HandlerError> {
            Ok(WorkflowOutcome::succeeded("run-1"))
        }
    }

    struct InvalidHandler;

    #[async_trait]
    impl StageHandler for InvalidHandler {
        async fn validate(
            &self,
            _stage: &StageConfig,
        ) -> Result<StageValidation, crate::handler::HandlerError> {
            Ok(StageValidation::failed(vec![
                "workflow not found".to_string(),
                "missing credentials".to_string(),
            ]))
        }

        async fn execute(
            &self,
            _stage: &StageConfig,
        ) -> Result<WorkflowOutcome, crate::handler::HandlerError> {
            panic!("execute must not run when validation fails");
        }
    }

    struct RejectingPolicy;

    #[async_trait]
    impl ApprovalPolicy for RejectingPolicy {
        async fn decide(
            &self,
            _request: &ApprovalRequest,
        ) -> Result<ApprovalDecision, ApprovalError> {
            Ok(ApprovalDecision::reject("release-manager", "not during freeze"))
        }
    }

    fn stage(requires_approval: bool) -> StageConfig {
        serde_yaml::from_str(&format!(
            r#"
            id: deploy-prod
            name: Deploy to production
            order: 1
            environment: production
            requires_approval: {requires_approval}
            workflow:
              platform: github-actions
              workflow: deploy.yml
              repository: acme/app
            "#
        ))
        .unwrap()
    }

    fn executor(
        handler: Option<Arc<dyn StageHandler>>,
        approvals: Arc<dyn ApprovalPolicy>,
    ) -> StageExecutor {
        let registry = Arc::new(HandlerRegistry::new());
        if let Some(handler) = handler {
            registry.register(crate::config::CiPlatform::GithubActions, handler);
        }
        StageExecutor::new(registry, approvals, Arc::new(HttpProbe::new()), EventBus::default())
    }

    #[tokio::test]
    async fn unregistered_platform_fails_without_panicking() {
        let executor = executor(None, Arc::new(AutoApprove::new("test")));
        let ctx = StageContext::new(DeploymentId::new("d1"));

        let result = executor.execute(&stage(false), &ctx).await;

        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("no handler registered for platform 'github-actions'"));
    }

    #[tokio::test]
    async fn validation_errors_are_joined_into_the_failure() {
        let executor = executor(
            Some(Arc::new(InvalidHandler)),
            Arc::new(AutoApprove::new("test")),
        );
        let ctx = StageContext::new(DeploymentId::new("d1"));

        let result = executor.execute(&stage(false), &ctx).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("workflow not found; missing credentials"));
    }

    #[tokio::test]
    async fn rejected_approval_fails_the_stage() {
        let executor = executor(Some(Arc::new(PassingHandler)), Arc::new(RejectingPolicy));
        let ctx = StageContext::new(DeploymentId::new("d1"));

        let result = executor.execute(&stage(true), &ctx).await;

        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("approval rejected by release-manager: not during freeze"));
    }

    #[tokio::test]
    async fn approval_is_skipped_when_not_required() {
        let executor = executor(Some(Arc::new(PassingHandler)), Arc::new(RejectingPolicy));
        let ctx = StageContext::new(DeploymentId::new("d1"));

        // The rejecting policy never gets consulted.
        let result = executor.execute(&stage(false), &ctx).await;

        assert!(result.success);
        assert_eq!(result.state, StageState::Succeeded);
    }
}
