//! RediCraft - An in-memory key-value server with replication, clustering
//! and snapshot persistence
//!
//! RediCraft is designed with strong cohesion and loose coupling principles:
//! - Each module has a single, well-defined responsibility
//! - Modules communicate through clear, minimal interfaces
//! - No circular dependencies between modules

pub mod error;
pub mod config;
pub mod task;
pub mod net;
pub mod protocol;
pub mod store;
pub mod commands;
pub mod dispatch;
pub mod server;
pub mod cluster;
pub mod replication;
pub mod persistence;
pub mod web;

/// Re-export commonly used types
pub use error::{Error, Result};
pub use config::Config;
pub use store::{StorageEngine, Snapshot, EngineStats};
pub use protocol::Reply;
pub use commands::{Command, CommandContext};
pub use dispatch::Dispatcher;
pub use cluster::{ClusterCoordinator, ClusterNode};
pub use replication::{ReplicationCoordinator, ReplicationRole, ReplicationLink};
pub use persistence::PersistenceManager;
