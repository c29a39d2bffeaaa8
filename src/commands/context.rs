//! Command execution context

use crate::cluster::ClusterCoordinator;
use crate::replication::ReplicationCoordinator;
use crate::store::StorageEngine;
use std::sync::Arc;

/// Context provided to commands during execution
///
/// This context gives commands access to the engine and, when those
/// components are running, to the cluster and replication coordinators.
/// It is cheap to clone.
#[derive(Clone)]
pub struct CommandContext {
    /// The storage engine
    pub engine: Arc<StorageEngine>,

    /// Cluster coordinator, present when clustering is enabled
    pub cluster: Option<Arc<ClusterCoordinator>>,

    /// Replication coordinator, used for status output only
    pub replication: Option<Arc<ReplicationCoordinator>>,
}

impl CommandContext {
    /// Create a context over a fresh engine
    pub fn new() -> Self {
        Self::with_engine(Arc::new(StorageEngine::new()))
    }

    /// Create a context over an existing engine
    pub fn with_engine(engine: Arc<StorageEngine>) -> Self {
        CommandContext {
            engine,
            cluster: None,
            replication: None,
        }
    }

    /// Attach a cluster coordinator
    pub fn set_cluster(&mut self, cluster: Arc<ClusterCoordinator>) {
        self.cluster = Some(cluster);
    }

    /// Attach a replication coordinator
    pub fn set_replication(&mut self, replication: Arc<ReplicationCoordinator>) {
        self.replication = Some(replication);
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new()
    }
}
