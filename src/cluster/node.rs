//! Cluster node registry

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;

/// A peer registered in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterNode {
    pub host: String,
    pub port: u16,
    pub is_master: bool,
    pub is_alive: bool,
}

impl ClusterNode {
    /// Create a node, assumed alive until probed
    pub fn new(host: impl Into<String>, port: u16, is_master: bool) -> Self {
        ClusterNode {
            host: host.into(),
            port,
            is_master,
            is_alive: true,
        }
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn matches(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }
}

impl fmt::Display for ClusterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {}",
            self.host,
            self.port,
            if self.is_master { "master" } else { "replica" },
            if self.is_alive { "alive" } else { "dead" }
        )
    }
}

/// Ordered list of nodes behind a read-write lock
///
/// Readers only ever get copies.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<Vec<ClusterNode>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or update the role of the node already at that address
    ///
    /// Returns true when the node was not registered before.
    pub fn add(&self, host: &str, port: u16, is_master: bool) -> bool {
        let mut nodes = self.nodes.write();
        if let Some(node) = nodes.iter_mut().find(|n| n.matches(host, port)) {
            node.is_master = is_master;
            return false;
        }
        nodes.push(ClusterNode::new(host, port, is_master));
        true
    }

    /// Remove the node at that address; returns false if it was not registered
    pub fn remove(&self, host: &str, port: u16) -> bool {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|n| !n.matches(host, port));
        nodes.len() != before
    }

    pub fn contains(&self, host: &str, port: u16) -> bool {
        self.nodes.read().iter().any(|n| n.matches(host, port))
    }

    /// Node at `index`, copied out
    pub fn get(&self, index: usize) -> Option<ClusterNode> {
        self.nodes.read().get(index).cloned()
    }

    /// Copy of the whole registry
    pub fn snapshot(&self) -> Vec<ClusterNode> {
        self.nodes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Record a probe result; nodes removed since the probe started are ignored
    pub fn set_alive(&self, host: &str, port: u16, alive: bool) {
        let mut nodes = self.nodes.write();
        if let Some(node) = nodes.iter_mut().find(|n| n.matches(host, port)) {
            node.is_alive = alive;
        }
    }

    /// (alive, total)
    pub fn liveness(&self) -> (usize, usize) {
        let nodes = self.nodes.read();
        (nodes.iter().filter(|n| n.is_alive).count(), nodes.len())
    }
}
