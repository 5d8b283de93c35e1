// ABOUTME: Integration tests for end-to-end pipeline execution.
// ABOUTME: Covers success, fail-fast, health gating, status, and metrics.

mod support;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use convoy::pipeline::{DeploymentState, StageState};
use convoy::types::DeploymentId;
use support::{
    deployment, environment, orchestrator, stage, stage_with_health, CannedProbe, ScriptedHandler,
};

#[tokio::test]
async fn three_stage_pipeline_succeeds() {
    let handler = Arc::new(ScriptedHandler::all_pass());
    let (orchestrator, ledger) = orchestrator(handler.clone(), Arc::new(CannedProbe::healthy()));

    let config = deployment(
        "payments",
        "1.2.0",
        vec![stage("build", 1), stage("staging", 2), stage("production", 3)],
    );

    let result = orchestrator
        .execute_pipeline(&config, CancellationToken::new())
        .await;

    assert!(result.success);
    assert_eq!(result.state, DeploymentState::Succeeded);
    assert_eq!(result.stage_results.len(), 3);
    assert!(result.stage_results.iter().all(|r| r.success));
    assert_eq!(handler.executed_ids(), vec!["build", "staging", "production"]);

    let metrics = result.metrics;
    assert_eq!(metrics.stages_executed, 3);
    assert_eq!(metrics.successful_stages, 3);
    assert_eq!(metrics.failed_stages, 0);

    let status = orchestrator.get_status(&config.id);
    assert_eq!(status.state, DeploymentState::Succeeded);
    assert_eq!(status.progress_percentage, 100);

    // A successful run becomes the active version for its environment.
    let active = ledger.active_version(&environment("production")).unwrap();
    assert_eq!(active.version, "1.2.0");
}

#[tokio::test]
async fn failing_stage_halts_the_sequence() {
    let handler = Arc::new(ScriptedHandler::failing(&["staging"]));
    let (orchestrator, ledger) = orchestrator(handler.clone(), Arc::new(CannedProbe::healthy()));

    let config = deployment(
        "payments",
        "1.2.0",
        vec![stage("build", 1), stage("staging", 2), stage("production", 3)],
    );

    let result = orchestrator
        .execute_pipeline(&config, CancellationToken::new())
        .await;

    assert!(!result.success);
    assert_eq!(result.state, DeploymentState::Failed);
    // Stage 3 never ran; partial results are preserved.
    assert_eq!(result.stage_results.len(), 2);
    assert!(result.stage_results[0].success);
    assert!(!result.stage_results[1].success);
    assert_eq!(handler.executed_ids(), vec!["build", "staging"]);

    assert_eq!(result.metrics.stages_executed, 2);
    assert_eq!(result.metrics.successful_stages, 1);
    assert_eq!(result.metrics.failed_stages, 1);

    // No version is recorded for a failed deployment.
    assert!(ledger.active_version(&environment("production")).is_none());
}

#[tokio::test]
async fn unhealthy_endpoint_fails_the_stage_despite_workflow_success() {
    let probe = CannedProbe::with_status("http://app.internal/healthz", 503);
    let (orchestrator, _) = orchestrator(Arc::new(ScriptedHandler::all_pass()), Arc::new(probe));

    let config = deployment(
        "payments",
        "1.2.0",
        vec![stage_with_health(
            "production",
            1,
            &["http://app.internal/ready", "http://app.internal/healthz"],
        )],
    );

    let result = orchestrator
        .execute_pipeline(&config, CancellationToken::new())
        .await;

    assert!(!result.success);
    let stage_result = &result.stage_results[0];
    assert!(!stage_result.success);
    assert_eq!(stage_result.state, StageState::Failed);
    assert_eq!(stage_result.health_checks.len(), 2);
    assert!(stage_result.health_checks.iter().any(|h| h.healthy));
    assert!(stage_result.health_checks.iter().any(|h| !h.healthy));
    assert!(stage_result
        .error
        .as_deref()
        .unwrap()
        .contains("1 of 2 endpoint(s) unhealthy"));
}

#[tokio::test]
async fn invalid_config_fails_without_running_stages() {
    let handler = Arc::new(ScriptedHandler::all_pass());
    let (orchestrator, _) = orchestrator(handler.clone(), Arc::new(CannedProbe::healthy()));

    let mut config = deployment("payments", "1.2.0", vec![stage("build", 1)]);
    config.version = String::new();

    let result = orchestrator
        .execute_pipeline(&config, CancellationToken::new())
        .await;

    assert!(!result.success);
    assert_eq!(result.state, DeploymentState::Failed);
    assert!(result.stage_results.is_empty());
    assert!(result.message.contains("validation failed"));
    assert!(handler.executed_ids().is_empty());
}

#[tokio::test]
async fn unknown_deployment_reports_not_found_status() {
    let (orchestrator, _) =
        orchestrator(Arc::new(ScriptedHandler::all_pass()), Arc::new(CannedProbe::healthy()));

    let status = orchestrator.get_status(&DeploymentId::new("no-such-deployment"));
    assert_eq!(status.state, DeploymentState::NotFound);
    assert_eq!(status.progress_percentage, 0);

    assert!(orchestrator
        .get_metrics(&DeploymentId::new("no-such-deployment"))
        .is_none());
}

#[tokio::test]
async fn concurrent_deployments_track_independent_status() {
    let (orchestrator, _) =
        orchestrator(Arc::new(ScriptedHandler::failing(&["bad"])), Arc::new(CannedProbe::healthy()));

    let ok = deployment("alpha", "1.0.0", vec![stage("good", 1)]);
    let broken = deployment("beta", "2.0.0", vec![stage("bad", 1)]);

    let (ok_result, broken_result) = tokio::join!(
        orchestrator.execute_pipeline(&ok, CancellationToken::new()),
        orchestrator.execute_pipeline(&broken, CancellationToken::new()),
    );

    assert!(ok_result.success);
    assert!(!broken_result.success);
    assert_eq!(orchestrator.get_status(&ok.id).state, DeploymentState::Succeeded);
    assert_eq!(orchestrator.get_status(&broken.id).state, DeploymentState::Failed);
}

#[tokio::test]
async fn cancellation_stops_the_pipeline() {
    let (orchestrator, _) =
        orchestrator(Arc::new(ScriptedHandler::all_pass()), Arc::new(CannedProbe::healthy()));

    let config = deployment("payments", "1.2.0", vec![stage("build", 1)]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = orchestrator.execute_pipeline(&config, cancel).await;

    assert!(!result.success);
    assert_eq!(result.state, DeploymentState::Failed);
    assert!(!result.stage_results[0].success);
}

#[tokio::test]
async fn metrics_counts_stay_consistent() {
    let (orchestrator, _) =
        orchestrator(Arc::new(ScriptedHandler::failing(&["c"])), Arc::new(CannedProbe::healthy()));

    let config = deployment(
        "payments",
        "1.2.0",
        vec![stage("a", 1), stage("b", 2), stage("c", 3), stage("d", 4)],
    );

    let result = orchestrator
        .execute_pipeline(&config, CancellationToken::new())
        .await;

    let metrics = orchestrator.get_metrics(&config.id).unwrap();
    assert_eq!(
        metrics.successful_stages + metrics.failed_stages,
        metrics.stages_executed
    );
    assert_eq!(metrics.stages_executed, result.stage_results.len());
    assert_eq!(metrics.stages.len(), result.stage_results.len());
}
