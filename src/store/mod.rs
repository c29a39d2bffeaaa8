//! In-memory storage module
//!
//! Provides the typed partitions, the storage engine built on them and the
//! snapshot type used by persistence and replication.
//! This module is independent of protocol and networking (loose coupling).

mod entry;
mod partition;
mod engine;
mod snapshot;

pub use entry::Entry;
pub use partition::{Partition, PartitionMap};
pub use engine::{StorageEngine, EngineStats};
pub use snapshot::Snapshot;
