// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates convoy.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, id: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(id.unwrap_or("my-service"));
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(id: &str) -> String {
    format!(
        r#"id: {id}
name: {id}
version: 0.1.0
environment: production
stages:
  - id: deploy-staging
    name: Deploy to staging
    order: 1
    environment: staging
    workflow:
      platform: github-actions
      workflow: deploy.yml
      repository: acme/{id}
    health_check:
      endpoints:
        - http://staging.example.com/healthz
  - id: deploy-production
    name: Deploy to production
    order: 2
    environment: production
    requires_approval: true
    workflow:
      platform: github-actions
      workflow: deploy.yml
      repository: acme/{id}
# rollback:
#   auto_rollback: true
#   grace_period: 30s
"#
    )
}
