// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod environment;
mod id;

pub use environment::{EnvironmentName, EnvironmentNameError};
pub use id::{DeploymentId, RollbackId, StageId};
