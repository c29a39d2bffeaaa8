//! Node liveness probing

use super::node::NodeRegistry;
use crate::net::exchange;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Heartbeat line sent to every node
pub const PROBE_MESSAGE: &str = "PING CLUSTER";

/// Probe one node; any failure counts as dead
pub async fn probe_node(address: &str, timeout: Duration) -> bool {
    match exchange(address, PROBE_MESSAGE, timeout).await {
        Ok(reply) => reply.contains("PONG"),
        Err(e) => {
            debug!("Probe of {} failed: {}", address, e);
            false
        }
    }
}

/// Probe every registered node once
///
/// The registry lock is only held to copy the node list and to write results.
pub async fn probe_all(registry: &NodeRegistry, timeout: Duration) {
    for node in registry.snapshot() {
        let alive = probe_node(&node.address(), timeout).await;

        if alive != node.is_alive {
            if alive {
                info!("Node {} is back online", node.address());
            } else {
                warn!("Node {} is not responding", node.address());
            }
        }

        registry.set_alive(&node.host, node.port, alive);
    }
}

/// Probe all nodes every `interval` until cancelled
pub(super) async fn discovery_loop(
    registry: &NodeRegistry,
    interval: Duration,
    timeout: Duration,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = probe_all(registry, timeout) => {}
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
