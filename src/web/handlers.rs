//! HTTP handlers for the web interface

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sysinfo::System;
use tracing::debug;

use crate::cluster::{ClusterCoordinator, ClusterNode};
use crate::dispatch::Dispatcher;
use crate::persistence::{PersistenceManager, SaveStatus};
use crate::replication::{ReplicationCoordinator, ReplicationLink};
use crate::store::EngineStats;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub cluster: Option<Arc<ClusterCoordinator>>,
    pub replication: Option<Arc<ReplicationCoordinator>>,
    pub persistence: Option<Arc<PersistenceManager>>,
}

impl AppState {
    /// State exposing only the dispatcher
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        AppState {
            dispatcher,
            cluster: None,
            replication: None,
            persistence: None,
        }
    }
}

/// Request body for command execution
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// The command line, e.g., "SET key value"
    pub command: String,
}

/// Response for command execution
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Whether the command succeeded
    pub success: bool,
    /// The reply text, one line per reply line
    pub result: String,
}

/// System statistics response
#[derive(Debug, Serialize)]
pub struct SystemStats {
    /// Total system memory in MB
    pub total_memory_mb: f64,
    /// Used system memory in MB
    pub used_memory_mb: f64,
    /// Free system memory in MB
    pub free_memory_mb: f64,
    /// Resident memory of this process in MB
    pub process_memory_mb: f64,
    /// CPU usage percentage (0-100)
    pub cpu_usage: f64,
    /// Live keys per partition
    pub keyspace: EngineStats,
}

#[derive(Debug, Serialize)]
pub struct ClusterStatus {
    pub enabled: bool,
    pub healthy: bool,
    pub nodes: Vec<ClusterNode>,
}

#[derive(Debug, Serialize)]
pub struct ReplicationStatus {
    pub enabled: bool,
    pub link: Option<ReplicationLink>,
}

#[derive(Debug, Serialize)]
pub struct PersistenceStatus {
    pub enabled: bool,
    pub saving: bool,
    pub last_save: Option<SaveStatus>,
}

const MB: f64 = 1024.0 * 1024.0;

/// Execute a command
pub async fn execute_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> (StatusCode, Json<CommandResponse>) {
    debug!("Executing command: {}", req.command);

    if req.command.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(CommandResponse {
                success: false,
                result: "Empty command".to_string(),
            }),
        );
    }

    let reply = state.dispatcher.dispatch_line(&req.command).await;

    (
        StatusCode::OK,
        Json(CommandResponse {
            success: !reply.is_error(),
            result: reply.to_string(),
        }),
    )
}

/// Get system statistics
pub async fn stats_handler(State(state): State<AppState>) -> (StatusCode, Json<SystemStats>) {
    let mut sys = System::new_all();
    sys.refresh_all();

    let total_mem_bytes = sys.total_memory();
    let available_mem_bytes = sys.available_memory();
    let used_mem_bytes = total_mem_bytes.saturating_sub(available_mem_bytes);

    let process_mem_bytes = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid))
        .map_or(0, |process| process.memory());

    let stats = SystemStats {
        total_memory_mb: total_mem_bytes as f64 / MB,
        used_memory_mb: used_mem_bytes as f64 / MB,
        free_memory_mb: available_mem_bytes as f64 / MB,
        process_memory_mb: process_mem_bytes as f64 / MB,
        cpu_usage: f64::from(sys.global_cpu_usage()),
        keyspace: state.dispatcher.engine().stats(),
    };

    (StatusCode::OK, Json(stats))
}

/// Node registry and health
pub async fn cluster_handler(State(state): State<AppState>) -> (StatusCode, Json<ClusterStatus>) {
    let status = match &state.cluster {
        Some(cluster) => ClusterStatus {
            enabled: true,
            healthy: cluster.is_cluster_healthy(),
            nodes: cluster.nodes(),
        },
        None => ClusterStatus {
            enabled: false,
            healthy: false,
            nodes: Vec::new(),
        },
    };

    (StatusCode::OK, Json(status))
}

/// Replication role and link state
pub async fn replication_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReplicationStatus>) {
    let status = ReplicationStatus {
        enabled: state.replication.is_some(),
        link: state.replication.as_ref().map(|r| r.link()),
    };

    (StatusCode::OK, Json(status))
}

/// Outcome of the last save
pub async fn persistence_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<PersistenceStatus>) {
    let status = match &state.persistence {
        Some(persistence) => PersistenceStatus {
            enabled: true,
            saving: persistence.is_saving(),
            last_save: persistence.last_save(),
        },
        None => PersistenceStatus {
            enabled: false,
            saving: false,
            last_save: None,
        },
    };

    (StatusCode::OK, Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(Arc::new(Dispatcher::new()))
    }

    fn request(command: &str) -> Json<CommandRequest> {
        Json(CommandRequest {
            command: command.to_string(),
        })
    }

    #[tokio::test]
    async fn test_execute_command() {
        let state = state();

        let (status, Json(body)) = execute_command(State(state.clone()), request("SET a 1")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(body.result, "OK");

        let (_, Json(body)) = execute_command(State(state.clone()), request("GET a")).await;
        assert_eq!(body.result, "1");

        let (_, Json(body)) = execute_command(State(state), request("NOPE")).await;
        assert!(!body.success);
        assert_eq!(body.result, "ERROR: unknown command 'NOPE'");
    }

    #[tokio::test]
    async fn test_raw_line_break_is_rejected() {
        let state = state();

        let (_, Json(body)) =
            execute_command(State(state.clone()), request("SET k \"a\nb\"")).await;
        assert!(!body.success);
        assert_eq!(state.dispatcher.engine().get("k"), None);

        let (_, Json(body)) = execute_command(State(state.clone()), request(r#"SET k "a\nb""#)).await;
        assert!(body.success);
        assert_eq!(state.dispatcher.engine().get("k"), Some("a\nb".to_string()));
    }

    #[tokio::test]
    async fn test_empty_command() {
        let (status, Json(body)) = execute_command(State(state()), request("  ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_status_without_components() {
        let (_, Json(cluster)) = cluster_handler(State(state())).await;
        assert!(!cluster.enabled);

        let (_, Json(replication)) = replication_handler(State(state())).await;
        assert!(replication.link.is_none());

        let (_, Json(persistence)) = persistence_handler(State(state())).await;
        assert!(!persistence.enabled);
    }

    #[tokio::test]
    async fn test_cluster_status() {
        let mut state = state();
        let cluster = Arc::new(ClusterCoordinator::new());
        cluster.add_node("10.0.0.1", 7381, true);
        state.cluster = Some(cluster);

        let (_, Json(status)) = cluster_handler(State(state)).await;
        assert!(status.enabled);
        assert!(status.healthy);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["nodes"][0]["host"], "10.0.0.1");
        assert_eq!(json["nodes"][0]["is_alive"], true);
    }

    #[tokio::test]
    async fn test_replication_status_json() {
        let mut state = state();
        let engine = state.dispatcher.engine().clone();
        state.replication = Some(Arc::new(ReplicationCoordinator::new(
            engine,
            crate::replication::ReplicationRole::Slave,
        )));

        let (_, Json(status)) = replication_handler(State(state)).await;
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["enabled"], true);
        assert_eq!(json["link"]["role"], "slave");
        assert_eq!(json["link"]["connected"], false);
    }
}
