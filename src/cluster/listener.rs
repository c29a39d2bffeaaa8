//! Inbound side of the cluster control channel
//!
//! Line protocol:
//! - `PING <anything>` replies `PONG`
//! - `NODE host port [master]` registers the sender if unknown, replies `NODE_OK`
//! - anything else replies `COMMAND_PROCESSED`

use super::node::NodeRegistry;
use crate::net::{read_line, write_line};
use std::sync::Arc;
use tokio::io::{self, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Accept peers until cancelled
pub(super) async fn accept_loop(
    listener: TcpListener,
    registry: Arc<NodeRegistry>,
    token: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        let accepted = tokio::select! {
            _ = token.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((socket, peer)) => {
                debug!("Cluster peer connected: {}", peer);
                let registry = registry.clone();
                let token = token.clone();

                tracker.spawn(async move {
                    if let Err(e) = handle_peer(socket, &registry, token).await {
                        warn!("Cluster connection error from {}: {}", peer, e);
                    }
                    debug!("Cluster peer disconnected: {}", peer);
                });
            }
            Err(e) => {
                // Per-connection failure, keep accepting
                warn!("Cluster accept failed: {}", e);
            }
        }
    }
}

async fn handle_peer(
    socket: TcpStream,
    registry: &NodeRegistry,
    token: CancellationToken,
) -> io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let line = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            line = read_line(&mut reader) => line?,
        };

        let Some(line) = line else {
            return Ok(());
        };

        let reply = control_reply(&line, registry);
        write_line(&mut writer, reply).await?;
    }
}

/// Reply to one control line
pub(super) fn control_reply(line: &str, registry: &NodeRegistry) -> &'static str {
    if line.starts_with("PING ") {
        return "PONG";
    }

    if line.starts_with("NODE") {
        if let Some((host, port, is_master)) = parse_announcement(line) {
            if !registry.contains(&host, port) {
                registry.add(&host, port, is_master);
                info!("Node {}:{} joined the cluster", host, port);
            }
        }
        return "NODE_OK";
    }

    "COMMAND_PROCESSED"
}

fn parse_announcement(line: &str) -> Option<(String, u16, bool)> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "NODE" {
        return None;
    }

    let host = parts.next()?.to_string();
    let port = parts.next()?.parse().ok()?;
    let is_master = parts
        .next()
        .map_or(false, |flag| matches!(flag.to_ascii_lowercase().as_str(), "master" | "true" | "1"));

    Some((host, port, is_master))
}
