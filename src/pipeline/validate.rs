// ABOUTME: Pre-flight validation of a deployment configuration.
// ABOUTME: Pure function over the config, so repeated validation is identical.

use std::collections::HashSet;

use crate::config::DeploymentConfig;

/// Result of validating a deployment config. Errors block execution;
/// warnings are surfaced but non-fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Validate a deployment config before any stage runs.
///
/// Duplicate stage ids are reported individually, not deduplicated
/// away. A zero timeout is legal but suspicious, so it warns.
pub fn validate(config: &DeploymentConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.id.as_str().trim().is_empty() {
        report.errors.push("deployment id must not be empty".to_string());
    }
    if config.name.trim().is_empty() {
        report.errors.push("deployment name must not be empty".to_string());
    }
    if config.version.trim().is_empty() {
        report
            .errors
            .push("deployment version must not be empty".to_string());
    }

    let mut seen = HashSet::new();
    for stage in &config.stages {
        if stage.id.as_str().trim().is_empty() {
            report
                .errors
                .push(format!("stage '{}' has an empty id", stage.name));
        } else if !seen.insert(stage.id.clone()) {
            report
                .errors
                .push(format!("duplicate stage id: {}", stage.id));
        }
    }

    if config.timeout.is_zero() {
        report
            .warnings
            .push("deployment timeout is zero; stages will not be bounded".to_string());
    }

    report
}
