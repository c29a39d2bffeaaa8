//! Slave side: connect to the master, apply every line it sends, reconnect on loss

use super::master::{SNAPSHOT_END, SNAPSHOT_START};
use super::LinkState;
use crate::dispatch::Dispatcher;
use crate::net::read_line;
use std::time::Duration;
use tokio::io::{self, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Connect/retry loop, runs until cancelled
pub(super) async fn run(
    master_addr: String,
    applier: &Dispatcher,
    state: &LinkState,
    retry: Duration,
    token: CancellationToken,
) {
    loop {
        let connected = tokio::select! {
            _ = token.cancelled() => break,
            connected = TcpStream::connect(&master_addr) => connected,
        };

        match connected {
            Ok(stream) => {
                info!("Connected to master {}", master_addr);
                state.set_connected(true);

                match follow(stream, applier, &token).await {
                    Ok(()) if token.is_cancelled() => {}
                    Ok(()) => warn!("Master {} closed the connection", master_addr),
                    Err(e) => warn!("Lost connection to master {}: {}", master_addr, e),
                }
                state.set_connected(false);
            }
            Err(e) => warn!("Failed to connect to master {}: {}", master_addr, e),
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(retry) => {}
        }
    }

    state.set_connected(false);
}

async fn follow(stream: TcpStream, applier: &Dispatcher, token: &CancellationToken) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut applied = 0usize;

    loop {
        let line = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            line = read_line(&mut reader) => line?,
        };

        let Some(line) = line else {
            return Ok(());
        };

        match line.as_str() {
            SNAPSHOT_START => {
                // Full resync
                applier.engine().flush_all();
                applied = 0;
                debug!("Snapshot started");
            }
            SNAPSHOT_END => {
                info!("Snapshot applied: {} commands", applied);
            }
            _ => {
                let reply = applier.dispatch_line(&line).await;
                if reply.is_error() {
                    warn!("Replicated command failed: {} ({})", line, reply);
                }
                applied += 1;
            }
        }
    }
}
