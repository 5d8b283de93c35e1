// ABOUTME: Version history and rollback execution.
// ABOUTME: Exports the ledger and its version/result types.

mod ledger;
mod version;

pub use ledger::VersionLedger;
pub use version::{DeploymentVersion, RollbackResult, RollbackState};
