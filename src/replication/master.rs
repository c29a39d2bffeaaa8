//! Master side: serve one full snapshot per replica, then keep the link warm

use super::LinkState;
use crate::net::write_line;
use crate::protocol::join_command;
use crate::store::{Snapshot, StorageEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::io;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

pub const SNAPSHOT_START: &str = "SNAPSHOT_START";
pub const SNAPSHOT_END: &str = "SNAPSHOT_END";
pub const KEEPALIVE: &str = "PING";

/// Command lines that rebuild `snapshot` on an empty engine
///
/// Keys come out in sorted order.
pub fn snapshot_lines(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshot.key_count());

    for (key, value) in &snapshot.strings {
        lines.push(join_command(&["SET", key.as_str(), value.as_str()]));
    }

    for (key, fields) in &snapshot.hashes {
        for (field, value) in fields {
            lines.push(join_command(&["HSET", key.as_str(), field.as_str(), value.as_str()]));
        }
    }

    for (key, values) in &snapshot.lists {
        if values.is_empty() {
            continue;
        }
        let mut tokens = vec!["LPUSH", key.as_str()];
        tokens.extend(values.iter().map(String::as_str));
        lines.push(join_command(&tokens));
    }

    for (key, members) in &snapshot.sets {
        if members.is_empty() {
            continue;
        }
        let mut tokens = vec!["SADD", key.as_str()];
        tokens.extend(members.iter().map(String::as_str));
        lines.push(join_command(&tokens));
    }

    lines
}

/// Accept replicas until cancelled
pub(super) async fn accept_loop(
    listener: TcpListener,
    engine: Arc<StorageEngine>,
    state: Arc<LinkState>,
    keepalive: Duration,
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
                info!("Replica connected from {}", peer);
                let engine = engine.clone();
                let state = state.clone();
                let token = token.clone();

                tracker.spawn(async move {
                    state.replica_connected();
                    if let Err(e) = serve_replica(socket, &engine, keepalive, token).await {
                        warn!("Replica {} dropped: {}", peer, e);
                    }
                    state.replica_disconnected();
                    info!("Replica disconnected: {}", peer);
                });
            }
            Err(e) => warn!("Replication accept failed: {}", e),
        }
    }
}

async fn serve_replica(
    mut socket: TcpStream,
    engine: &StorageEngine,
    keepalive: Duration,
    token: CancellationToken,
) -> io::Result<()> {
    let lines = snapshot_lines(&engine.snapshot());

    write_line(&mut socket, SNAPSHOT_START).await?;
    for line in &lines {
        write_line(&mut socket, line).await?;
    }
    write_line(&mut socket, SNAPSHOT_END).await?;
    debug!("Sent snapshot of {} lines", lines.len());

    let mut ticker = tokio::time::interval(keepalive);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = ticker.tick() => write_line(&mut socket, KEEPALIVE).await?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lines() {
        let engine = StorageEngine::new();
        engine.set("b", "two words");
        engine.set("a", "1");
        engine.hset("h", "f", "v");
        engine.lpush("l", &["x", "y"]);
        engine.sadd("s", &["m2", "m1"]);

        let lines = snapshot_lines(&engine.snapshot());
        assert_eq!(
            lines,
            vec![
                "SET a 1".to_string(),
                "SET b \"two words\"".to_string(),
                "HSET h f v".to_string(),
                "LPUSH l x y".to_string(),
                "SADD s m1 m2".to_string(),
            ]
        );
    }

    #[test]
    fn test_snapshot_lines_empty() {
        let engine = StorageEngine::new();
        assert!(snapshot_lines(&engine.snapshot()).is_empty());
    }
}
