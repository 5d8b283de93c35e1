// ABOUTME: Compile-fail test verifying DeploymentId and StageId are not interchangeable.
// ABOUTME: This test should fail to compile, validating type safety.

use convoy::types::{DeploymentId, StageId};

fn takes_deployment_id(_id: DeploymentId) {}

fn main() {
    let stage_id = StageId::new("deploy-prod");
    takes_deployment_id(stage_id); // ERROR: expected DeploymentId, found StageId
}
