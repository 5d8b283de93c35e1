// ABOUTME: Deployment pipeline: per-stage execution, ordered sequencing, and orchestration.
// ABOUTME: Exports the orchestrator plus the status, result, and metrics types it produces.

mod executor;
mod metrics;
mod orchestrator;
mod result;
mod sequencer;
mod status;
mod validate;

pub use executor::{StageContext, StageExecutor};
pub use metrics::{DeploymentMetrics, StageMetrics};
pub use orchestrator::PipelineOrchestrator;
pub use result::{DeploymentResult, StageResult, StageState};
pub use sequencer::StageSequencer;
pub use status::{DeploymentState, DeploymentStatus};
pub use validate::{validate, ValidationReport};
