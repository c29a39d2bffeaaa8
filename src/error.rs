//! Error types for RediCraft

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Protocol Errors ===
    #[error("{0}")]
    Protocol(String),

    // === Network Errors ===
    #[error("network error talking to {addr}: {source}")]
    Network {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out talking to {0}")]
    Timeout(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // === Config Errors ===
    #[error("invalid configuration at line {line}: {reason}")]
    Config { line: usize, reason: String },

    #[error("cannot read configuration file {path:?}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Persistence Errors ===
    #[error("persistence I/O error on {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a snapshot save is already in progress")]
    SaveInProgress,

    #[error("background save task failed: {0}")]
    SaveTask(String),

    // === Coordination Errors ===
    #[error("{0} is already running")]
    AlreadyRunning(&'static str),

    #[error("replication role is {actual}, expected {expected}")]
    RoleMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("no cluster node owns slot {0}")]
    NoNodeForSlot(u16),

    #[error("cluster node {0} is not alive")]
    NodeUnavailable(String),
}

impl Error {
    /// Wrap an I/O error raised while talking to `addr`
    pub fn network(addr: impl Into<String>, source: std::io::Error) -> Self {
        Error::Network {
            addr: addr.into(),
            source,
        }
    }

    /// Wrap an I/O error raised while reading or writing `path`
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }
}
