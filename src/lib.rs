// ABOUTME: Library root for convoy - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod approval;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod handler;
pub mod health;
pub mod pipeline;
pub mod rollback;
pub mod store;
pub mod types;
