// ABOUTME: Configuration types and parsing for convoy.yml.
// ABOUTME: The root type is DeploymentConfig: one requested multi-stage deployment.

mod healthcheck;
mod init;
mod rollback;
mod stage;

pub use healthcheck::HealthCheckConfig;
pub use init::init_config;
pub use rollback::{RollbackConfig, RollbackTriggers};
pub use stage::{CiPlatform, StageConfig, WorkflowRef};

use crate::error::{Error, Result};
use crate::rollback::DeploymentVersion;
use crate::types::{DeploymentId, EnvironmentName};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "convoy.yml";
pub const CONFIG_FILENAME_ALT: &str = "convoy.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".convoy/config.yml";

/// One requested deployment: identity, the ordered stages to run, and
/// the rollback policy to apply when they fail.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    pub id: DeploymentId,

    pub name: String,

    /// Version of the artifact being deployed.
    pub version: String,

    /// Environment the deployment as a whole targets; individual stages
    /// may deploy into earlier environments along the way.
    pub environment: EnvironmentName,

    /// At least one stage, enforced at the type level.
    pub stages: NonEmpty<StageConfig>,

    #[serde(default)]
    pub rollback: Option<RollbackConfig>,

    /// Overall pipeline bound. Zero is accepted with a warning.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Previously deployed versions to seed the ledger with.
    #[serde(default)]
    pub versions: Vec<DeploymentVersion>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(3600)
}

impl DeploymentConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Whether a failed run should be rolled back automatically.
    pub fn auto_rollback_enabled(&self) -> bool {
        self.rollback.as_ref().is_some_and(|r| r.auto_rollback)
    }
}
