//! Cluster coordination
//!
//! Keeps the node registry, maps keys to owning nodes through hash slots,
//! serves the control channel other nodes probe, and runs the liveness
//! probing loop.

mod listener;
mod node;
mod probe;
mod slot;

pub use node::{ClusterNode, NodeRegistry};
pub use probe::{probe_node, PROBE_MESSAGE};
pub use slot::{calculate_hash_slot, node_index_for_slot, HASH_SLOTS};

use crate::error::{Error, Result};
use crate::net::exchange;
use crate::task::BackgroundTask;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Default delay between two probing rounds
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Default I/O deadline for one probe or routed request
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Cluster coordinator that owns the node registry
pub struct ClusterCoordinator {
    nodes: Arc<NodeRegistry>,
    listener: BackgroundTask,
    discovery: BackgroundTask,
    probe_interval: Duration,
    probe_timeout: Duration,
}

impl ClusterCoordinator {
    /// Create a coordinator with an empty registry
    pub fn new() -> Self {
        ClusterCoordinator {
            nodes: Arc::new(NodeRegistry::new()),
            listener: BackgroundTask::new("cluster listener"),
            discovery: BackgroundTask::new("node discovery"),
            probe_interval: DEFAULT_PROBE_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Override the probe interval and I/O deadline
    pub fn with_probe_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.probe_interval = interval;
        self.probe_timeout = timeout;
        self
    }

    /// Register a node; an existing node at that address keeps its slot position
    pub fn add_node(&self, host: &str, port: u16, is_master: bool) -> bool {
        let added = self.nodes.add(host, port, is_master);
        if added {
            info!("Added node {}:{} to cluster", host, port);
        }
        added
    }

    /// Remove a node; unknown addresses are ignored
    pub fn remove_node(&self, host: &str, port: u16) -> bool {
        let removed = self.nodes.remove(host, port);
        if removed {
            info!("Removed node {}:{} from cluster", host, port);
        }
        removed
    }

    /// Node owning `slot`, from a copy of the registry
    pub fn find_node_for_slot(&self, slot: u16) -> Option<ClusterNode> {
        let nodes = self.nodes.snapshot();
        node_index_for_slot(slot, nodes.len()).and_then(|i| nodes.get(i).cloned())
    }

    /// Node owning `key`
    pub fn find_node_for_key(&self, key: &str) -> Option<ClusterNode> {
        self.find_node_for_slot(calculate_hash_slot(key))
    }

    /// Copy of the registry
    pub fn nodes(&self) -> Vec<ClusterNode> {
        self.nodes.snapshot()
    }

    /// (alive, total)
    pub fn liveness(&self) -> (usize, usize) {
        self.nodes.liveness()
    }

    /// At least half of the registered nodes (rounded up) are alive
    ///
    /// An empty registry is not healthy.
    pub fn is_cluster_healthy(&self) -> bool {
        let (alive, total) = self.nodes.liveness();
        total > 0 && alive >= (total + 1) / 2
    }

    /// Bind the control channel and start accepting peers
    ///
    /// Returns the bound address.
    pub async fn start_cluster(&self, addr: &str) -> Result<SocketAddr> {
        if !self.listener.begin() {
            return Err(Error::AlreadyRunning(self.listener.name()));
        }

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.listener.abort_begin();
                return Err(Error::Bind {
                    addr: addr.to_string(),
                    source,
                });
            }
        };

        let local = match listener.local_addr() {
            Ok(local) => local,
            Err(e) => {
                self.listener.abort_begin();
                return Err(Error::network(addr, e));
            }
        };

        self.listener.spawn(listener::accept_loop(
            listener,
            self.nodes.clone(),
            self.listener.token(),
            self.listener.tracker(),
        ));

        info!("Cluster manager started on {}", local);
        Ok(local)
    }

    /// Stop the control channel and wait for every peer handler
    pub async fn stop_cluster(&self) {
        if self.listener.is_running() {
            self.listener.stop().await;
            info!("Cluster manager stopped");
        }
    }

    /// Start the probing loop
    pub fn start_node_discovery(&self) -> Result<()> {
        if !self.discovery.begin() {
            return Err(Error::AlreadyRunning(self.discovery.name()));
        }

        let nodes = self.nodes.clone();
        let interval = self.probe_interval;
        let timeout = self.probe_timeout;
        let token = self.discovery.token();

        self.discovery.spawn(async move {
            probe::discovery_loop(&nodes, interval, timeout, token).await;
        });

        info!("Node discovery started");
        Ok(())
    }

    /// Stop the probing loop
    pub async fn stop_node_discovery(&self) {
        if self.discovery.is_running() {
            self.discovery.stop().await;
            info!("Node discovery stopped");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_running()
    }

    pub fn is_discovering(&self) -> bool {
        self.discovery.is_running()
    }

    /// Relay one command line to the node owning `key` and return its reply
    pub async fn relay(&self, key: &str, command: &str) -> Result<String> {
        let slot = calculate_hash_slot(key);
        let node = self
            .find_node_for_slot(slot)
            .ok_or(Error::NoNodeForSlot(slot))?;

        if !node.is_alive {
            return Err(Error::NodeUnavailable(node.address()));
        }

        let reply = exchange(&node.address(), command, self.probe_timeout).await?;
        info!(
            "Routed '{}' for key '{}' (slot {}) to {}: {}",
            command,
            key,
            slot,
            node.address(),
            reply
        );
        Ok(reply)
    }

    /// Relay one command line to the node owning `key`
    ///
    /// No retry and no connection reuse; failures are logged and reported as false.
    pub async fn route_request(&self, key: &str, command: &str) -> bool {
        match self.relay(key, command).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to route request for key '{}': {}", key, e);
                false
            }
        }
    }
}

impl Default for ClusterCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
