//! Master/slave replication
//!
//! A master serves a full snapshot to every replica that connects, framed by
//! `SNAPSHOT_START` / `SNAPSHOT_END`, followed by a `PING` keepalive line every
//! second. A slave keeps a connection to its master, applies every received
//! line through a dispatcher of its own, and reconnects after a delay when
//! the link drops.

mod master;
mod slave;

pub use master::{snapshot_lines, KEEPALIVE, SNAPSHOT_END, SNAPSHOT_START};

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::protocol::Reply;
use crate::store::StorageEngine;
use crate::task::BackgroundTask;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// Default delay before a slave reconnects
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Default delay between two master keepalive lines
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// Replication role of this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationRole {
    Master,
    Slave,
}

impl ReplicationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicationRole::Master => "master",
            ReplicationRole::Slave => "slave",
        }
    }
}

impl fmt::Display for ReplicationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicationRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "master" => Ok(ReplicationRole::Master),
            "slave" | "replica" => Ok(ReplicationRole::Slave),
            other => Err(format!("unknown replication role '{}'", other)),
        }
    }
}

/// Observable state of the replication link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationLink {
    pub role: ReplicationRole,
    /// Listening address (master) or master address (slave)
    pub peer: Option<String>,
    /// Slave: connected to the master. Master: listener running
    pub connected: bool,
    /// Replicas currently attached to this master
    pub replicas: usize,
}

/// Link counters shared with the background loops
#[derive(Debug, Default)]
pub(crate) struct LinkState {
    connected: AtomicBool,
    replicas: AtomicUsize,
}

impl LinkState {
    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn replica_connected(&self) {
        self.replicas.fetch_add(1, Ordering::SeqCst);
    }

    fn replica_disconnected(&self) {
        self.replicas.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Replication coordinator
pub struct ReplicationCoordinator {
    engine: Arc<StorageEngine>,
    applier: Arc<Dispatcher>,
    role: RwLock<ReplicationRole>,
    peer: Mutex<Option<String>>,
    state: Arc<LinkState>,
    master: BackgroundTask,
    slave: BackgroundTask,
    retry_interval: Duration,
    keepalive_interval: Duration,
}

impl ReplicationCoordinator {
    /// Create a coordinator in `role`; nothing runs until started
    pub fn new(engine: Arc<StorageEngine>, role: ReplicationRole) -> Self {
        ReplicationCoordinator {
            applier: Arc::new(Dispatcher::with_engine(engine.clone())),
            engine,
            role: RwLock::new(role),
            peer: Mutex::new(None),
            state: Arc::new(LinkState::default()),
            master: BackgroundTask::new("replication master"),
            slave: BackgroundTask::new("replication slave"),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }

    /// Override the reconnect delay and the keepalive period
    pub fn with_intervals(mut self, retry: Duration, keepalive: Duration) -> Self {
        self.retry_interval = retry;
        self.keepalive_interval = keepalive;
        self
    }

    /// Current role
    pub fn role(&self) -> ReplicationRole {
        *self.role.read()
    }

    /// Switch role, stopping whatever the previous role was running first
    pub async fn set_replication_role(&self, role: ReplicationRole) {
        self.stop_master().await;
        self.stop_slave().await;

        let previous = std::mem::replace(&mut *self.role.write(), role);
        if previous != role {
            info!("Replication role changed from {} to {}", previous, role);
        }
    }

    fn require_role(&self, expected: ReplicationRole) -> Result<()> {
        let actual = self.role();
        if actual != expected {
            return Err(Error::RoleMismatch {
                expected: expected.as_str(),
                actual: actual.as_str(),
            });
        }
        Ok(())
    }

    /// Start serving snapshots to replicas; returns the bound address
    pub async fn start_master(&self, addr: &str) -> Result<SocketAddr> {
        self.require_role(ReplicationRole::Master)?;

        if !self.master.begin() {
            return Err(Error::AlreadyRunning(self.master.name()));
        }

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.master.abort_begin();
                return Err(Error::Bind {
                    addr: addr.to_string(),
                    source,
                });
            }
        };

        let local = match listener.local_addr() {
            Ok(local) => local,
            Err(e) => {
                self.master.abort_begin();
                return Err(Error::network(addr, e));
            }
        };

        *self.peer.lock() = Some(local.to_string());
        self.state.set_connected(true);

        self.master.spawn(master::accept_loop(
            listener,
            self.engine.clone(),
            self.state.clone(),
            self.keepalive_interval,
            self.master.token(),
            self.master.tracker(),
        ));

        info!("Replication master started on {}", local);
        Ok(local)
    }

    /// Stop accepting replicas and wait for every replica handler
    pub async fn stop_master(&self) {
        if self.master.is_running() {
            self.master.stop().await;
            self.state.set_connected(false);
            info!("Replication master stopped");
        }
    }

    /// Start following the master at `master_addr`
    pub fn start_slave(&self, master_addr: &str) -> Result<()> {
        self.require_role(ReplicationRole::Slave)?;

        if !self.slave.begin() {
            return Err(Error::AlreadyRunning(self.slave.name()));
        }

        *self.peer.lock() = Some(master_addr.to_string());

        let master_addr = master_addr.to_string();
        let applier = self.applier.clone();
        let state = self.state.clone();
        let retry = self.retry_interval;
        let token = self.slave.token();

        self.slave.spawn(async move {
            slave::run(master_addr, &applier, &state, retry, token).await;
        });

        info!("Replication slave started");
        Ok(())
    }

    /// Drop the master connection and stop retrying
    pub async fn stop_slave(&self) {
        if self.slave.is_running() {
            self.slave.stop().await;
            self.state.set_connected(false);
            info!("Replication slave stopped");
        }
    }

    /// Framed snapshot payload a new replica receives
    pub fn generate_storage_snapshot(&self) -> String {
        let mut payload = String::new();
        payload.push_str(SNAPSHOT_START);
        payload.push_str("\r\n");
        for line in snapshot_lines(&self.engine.snapshot()) {
            payload.push_str(&line);
            payload.push_str("\r\n");
        }
        payload.push_str(SNAPSHOT_END);
        payload.push_str("\r\n");
        payload
    }

    /// Apply one replicated command line to the local engine
    pub async fn process_replication_command(&self, line: &str) -> Reply {
        self.applier.dispatch_line(line).await
    }

    /// Current link state
    pub fn link(&self) -> ReplicationLink {
        ReplicationLink {
            role: self.role(),
            peer: self.peer.lock().clone(),
            connected: self.state.connected.load(Ordering::SeqCst),
            replicas: self.state.replicas.load(Ordering::SeqCst),
        }
    }
}
