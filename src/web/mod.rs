//! Web status surface
//!
//! Provides an HTTP server for running commands and inspecting the engine,
//! the cluster registry, the replication link and the last save.

mod handlers;
mod server;

pub use handlers::{AppState, CommandRequest, CommandResponse};
pub use server::{router, serve};
