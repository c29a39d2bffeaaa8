//! CLUSTER command
//!
//! Syntax:
//! - CLUSTER KEYSLOT key
//! - CLUSTER NODES
//! - CLUSTER HEALTH
//! - CLUSTER ADDNODE host port [master]
//! - CLUSTER DELNODE host port
//! - CLUSTER ROUTE key command [arg ...]
//!
//! Routing performs network I/O, so this command runs outside the synchronous
//! registry.

use super::CommandContext;
use crate::cluster::calculate_hash_slot;
use crate::protocol::{join_command, Reply};

/// Command name the dispatcher intercepts
pub const NAME: &str = "CLUSTER";

/// Execute a CLUSTER sub-command
pub async fn execute(ctx: &CommandContext, args: &[String]) -> Reply {
    let Some(cluster) = &ctx.cluster else {
        return Reply::error("clustering is disabled");
    };

    let Some(subcommand) = args.first() else {
        return Reply::error("wrong number of arguments for 'CLUSTER' command");
    };
    let rest = &args[1..];

    match subcommand.to_uppercase().as_str() {
        "KEYSLOT" => match rest {
            [key] => Reply::Integer(i64::from(calculate_hash_slot(key))),
            _ => Reply::error("CLUSTER KEYSLOT requires key"),
        },

        "NODES" => Reply::List(cluster.nodes().iter().map(|n| n.to_string()).collect()),

        "HEALTH" => {
            let (alive, total) = cluster.liveness();
            let state = if cluster.is_cluster_healthy() { "ok" } else { "fail" };
            Reply::Text(vec![
                format!("cluster_state:{}", state),
                format!("nodes_alive:{}", alive),
                format!("nodes_total:{}", total),
            ])
        }

        "ADDNODE" => {
            let (host, port, flag) = match rest {
                [host, port] => (host, port, None),
                [host, port, flag] => (host, port, Some(flag)),
                _ => return Reply::error("CLUSTER ADDNODE requires host and port"),
            };
            let Ok(port) = port.parse::<u16>() else {
                return Reply::error("Invalid port value");
            };
            let is_master = flag.map_or(false, |f| f.eq_ignore_ascii_case("master"));

            cluster.add_node(host, port, is_master);
            Reply::Ok
        }

        "DELNODE" => {
            let [host, port] = rest else {
                return Reply::error("CLUSTER DELNODE requires host and port");
            };
            let Ok(port) = port.parse::<u16>() else {
                return Reply::error("Invalid port value");
            };

            Reply::boolean(cluster.remove_node(host, port))
        }

        "ROUTE" => {
            if rest.len() < 2 {
                return Reply::error("CLUSTER ROUTE requires key and command");
            }
            let command = join_command(&rest[1..]);

            match cluster.relay(&rest[0], &command).await {
                Ok(_) => Reply::Ok,
                Err(e) => Reply::error(e.to_string()),
            }
        }

        other => Reply::error(format!("unknown CLUSTER subcommand '{}'", other)),
    }
}
