// ABOUTME: Per-stage configuration: ordering, approval gates, and workflow refs.
// ABOUTME: A stage is one unit of deployable work delegated to a CI platform.

use serde::Deserialize;
use std::time::Duration;

use crate::types::{EnvironmentName, StageId};

use super::HealthCheckConfig;

/// One ordered unit of deployment work.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub id: StageId,

    pub name: String,

    /// Position in the execution order. Ties are broken by position in
    /// the original stage list (stable sort).
    pub order: u32,

    /// Environment this stage deploys into.
    pub environment: EnvironmentName,

    /// Block on an explicit approval decision before running.
    #[serde(default)]
    pub requires_approval: bool,

    /// Continue the pipeline even if this stage fails. Off by default;
    /// fail-fast is the rule, best-effort stages opt in.
    #[serde(default)]
    pub continue_on_failure: bool,

    pub workflow: WorkflowRef,

    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,

    /// Bound on the delegated workflow execution. Unset means the stage
    /// waits as long as the CI platform takes.
    #[serde(default, with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
}

/// Descriptor for the CI workflow a stage delegates to.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRef {
    pub platform: CiPlatform,

    /// Platform-specific workflow identifier (file name or pipeline id).
    pub workflow: String,

    pub repository: String,

    /// Git ref to run the workflow against.
    #[serde(rename = "ref", default = "default_git_ref")]
    pub git_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CiPlatform {
    GithubActions,
    AzureDevops,
    Jenkins,
}

impl CiPlatform {
    pub const ALL: [CiPlatform; 3] = [
        CiPlatform::GithubActions,
        CiPlatform::AzureDevops,
        CiPlatform::Jenkins,
    ];
}

impl std::fmt::Display for CiPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GithubActions => write!(f, "github-actions"),
            Self::AzureDevops => write!(f, "azure-devops"),
            Self::Jenkins => write!(f, "jenkins"),
        }
    }
}

fn default_git_ref() -> String {
    "main".to_string()
}
