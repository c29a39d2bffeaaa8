//! Admin commands (PING, INFO, FLUSHDB)

use super::{Command, CommandContext};
use crate::protocol::Reply;

/// PING command - Liveness check
///
/// Syntax: PING [message]
///
/// Extra arguments are ignored; the replication keepalive and the cluster
/// probe both arrive as PING lines.
pub struct PingCommand;

impl Command for PingCommand {
    fn execute(&self, _ctx: &CommandContext, _args: &[String]) -> Reply {
        Reply::Pong
    }

    fn name(&self) -> &'static str {
        "PING"
    }
}

/// INFO command - Get information and statistics about the server
///
/// Syntax: INFO
pub struct InfoCommand;

impl Command for InfoCommand {
    fn execute(&self, ctx: &CommandContext, _args: &[String]) -> Reply {
        let stats = ctx.engine.stats();

        let mut lines = vec![
            "# Server".to_string(),
            format!("redicraft_version:{}", env!("CARGO_PKG_VERSION")),
            format!("os:{}", std::env::consts::OS),
            format!("arch:{}", std::env::consts::ARCH),
            String::new(),
            "# Keyspace".to_string(),
            format!("strings:{}", stats.strings),
            format!("hashes:{}", stats.hashes),
            format!("lists:{}", stats.lists),
            format!("sets:{}", stats.sets),
            format!("total_keys:{}", stats.total()),
        ];

        if let Some(replication) = &ctx.replication {
            lines.push(String::new());
            lines.push("# Replication".to_string());
            lines.push(format!("role:{}", replication.role()));
        }

        if let Some(cluster) = &ctx.cluster {
            let nodes = cluster.nodes();
            let alive = nodes.iter().filter(|n| n.is_alive).count();
            lines.push(String::new());
            lines.push("# Cluster".to_string());
            lines.push(format!("cluster_nodes:{}", nodes.len()));
            lines.push(format!("cluster_nodes_alive:{}", alive));
            lines.push(format!(
                "cluster_state:{}",
                if cluster.is_cluster_healthy() { "ok" } else { "fail" }
            ));
        }

        Reply::Text(lines)
    }

    fn name(&self) -> &'static str {
        "INFO"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// FLUSHDB command - Remove all keys from every partition
///
/// Syntax: FLUSHDB
pub struct FlushDbCommand;

impl Command for FlushDbCommand {
    fn execute(&self, ctx: &CommandContext, _args: &[String]) -> Reply {
        ctx.engine.flush_all();
        Reply::Ok
    }

    fn name(&self) -> &'static str {
        "FLUSHDB"
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
}
