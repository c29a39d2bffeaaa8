//! Server configuration
//!
//! A `key=value` text file. Blank lines and lines starting with `#` or `;`
//! are ignored; keys and values are trimmed. A value that does not parse
//! keeps its default and is reported with a warning.
//!
//! ```text
//! host=localhost
//! port=7379
//! persistence_enabled=true
//! cluster_node1=10.0.0.2:7381:true
//! ```

use crate::error::{Error, Result};
use crate::replication::ReplicationRole;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "redicraft.conf";

/// A statically configured cluster peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterNodeConfig {
    pub host: String,
    pub port: u16,
    pub is_master: bool,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub host: String,
    pub port: u16,

    pub persistence_enabled: bool,
    pub persistence_file: String,
    /// Seconds between automatic saves
    pub persistence_interval: u64,

    pub replication_enabled: bool,
    pub replication_role: ReplicationRole,
    pub replication_port: u16,
    pub master_host: String,
    pub master_port: u16,

    pub clustering_enabled: bool,
    pub cluster_port: u16,
    pub cluster_nodes: Vec<ClusterNodeConfig>,

    pub web_enabled: bool,
    pub web_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "localhost".to_string(),
            port: 7379,
            persistence_enabled: false,
            persistence_file: "redicraft.rdb".to_string(),
            persistence_interval: 60,
            replication_enabled: false,
            replication_role: ReplicationRole::Master,
            replication_port: 7380,
            master_host: "localhost".to_string(),
            master_port: 7379,
            clustering_enabled: false,
            cluster_port: 7381,
            cluster_nodes: Vec::new(),
            web_enabled: false,
            web_port: 8080,
        }
    }
}

impl Config {
    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Parse configuration text, starting from the defaults
    pub fn parse(text: &str) -> Self {
        let mut config = Config::default();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            if let Err(reason) = config.apply(key.trim(), value.trim()) {
                let err = Error::Config {
                    line: index + 1,
                    reason,
                };
                warn!("{}", err);
            }
        }

        config
    }

    fn apply(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "host" => self.host = value.to_string(),
            "port" => self.port = parse_value(key, value)?,
            "persistence_enabled" => self.persistence_enabled = parse_bool(value),
            "persistence_file" => self.persistence_file = value.to_string(),
            "persistence_interval" => self.persistence_interval = parse_value(key, value)?,
            "replication_enabled" => self.replication_enabled = parse_bool(value),
            "replication_role" => self.replication_role = value.parse()?,
            "replication_port" => self.replication_port = parse_value(key, value)?,
            "master_host" => self.master_host = value.to_string(),
            "master_port" => self.master_port = parse_value(key, value)?,
            "clustering_enabled" => self.clustering_enabled = parse_bool(value),
            "cluster_port" => self.cluster_port = parse_value(key, value)?,
            "web_enabled" => self.web_enabled = parse_bool(value),
            "web_port" => self.web_port = parse_value(key, value)?,
            _ if key.starts_with("cluster_node") => {
                self.cluster_nodes.push(parse_cluster_node(value)?);
            }
            // Unknown keys are tolerated
            _ => {}
        }
        Ok(())
    }

    /// Client listener address
    pub fn client_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cluster control channel address
    pub fn cluster_addr(&self) -> String {
        format!("{}:{}", self.host, self.cluster_port)
    }

    /// Replication listener address (master role)
    pub fn replication_addr(&self) -> String {
        format!("{}:{}", self.host, self.replication_port)
    }

    /// Address of the master to follow (slave role)
    pub fn master_addr(&self) -> String {
        format!("{}:{}", self.master_host, self.master_port)
    }

    /// Status surface address
    pub fn web_addr(&self) -> String {
        format!("{}:{}", self.host, self.web_port)
    }

    /// Auto-persistence period, at least one second
    pub fn persistence_interval(&self) -> Duration {
        Duration::from_secs(self.persistence_interval.max(1))
    }
}

fn parse_bool(value: &str) -> bool {
    value == "true" || value == "1"
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid value '{}' for {}", value, key))
}

/// `host:port:is_master`
fn parse_cluster_node(value: &str) -> std::result::Result<ClusterNodeConfig, String> {
    let mut parts = value.splitn(3, ':');
    let (Some(host), Some(port), Some(is_master)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("cluster node '{}' is not host:port:is_master", value));
    };

    if host.is_empty() {
        return Err(format!("cluster node '{}' has no host", value));
    }

    Ok(ClusterNodeConfig {
        host: host.to_string(),
        port: parse_value("cluster node port", port)?,
        is_master: parse_bool(is_master),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::parse("");
        assert_eq!(config, Config::default());
        assert_eq!(config.client_addr(), "localhost:7379");
        assert_eq!(config.persistence_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_values() {
        let text = "\
# comment
; another comment

host = 0.0.0.0
port=6000
persistence_enabled=1
persistence_file=data.rdb
persistence_interval=10
replication_enabled=true
replication_role=slave
master_host=10.0.0.1
master_port=6001
clustering_enabled=true
cluster_port=6002
cluster_node1=10.0.0.2:7381:true
cluster_node2=10.0.0.3:7381:0
web_enabled=true
web_port=9090
";
        let config = Config::parse(text);

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 6000);
        assert!(config.persistence_enabled);
        assert_eq!(config.persistence_file, "data.rdb");
        assert_eq!(config.persistence_interval, 10);
        assert!(config.replication_enabled);
        assert_eq!(config.replication_role, ReplicationRole::Slave);
        assert_eq!(config.master_addr(), "10.0.0.1:6001");
        assert!(config.clustering_enabled);
        assert_eq!(config.cluster_addr(), "0.0.0.0:6002");
        assert_eq!(
            config.cluster_nodes,
            vec![
                ClusterNodeConfig {
                    host: "10.0.0.2".to_string(),
                    port: 7381,
                    is_master: true
                },
                ClusterNodeConfig {
                    host: "10.0.0.3".to_string(),
                    port: 7381,
                    is_master: false
                },
            ]
        );
        assert!(config.web_enabled);
        assert_eq!(config.web_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = Config::parse(
            "port=abc\nreplication_role=leader\ncluster_node1=broken\ncluster_node2=h:notaport:1\npersistence_enabled=yes\nnoequals\n",
        );

        assert_eq!(config.port, 7379);
        assert_eq!(config.replication_role, ReplicationRole::Master);
        assert!(config.cluster_nodes.is_empty());
        assert!(!config.persistence_enabled);
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port=7000").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.port, 7000);

        let missing = Config::load("/nonexistent/redicraft.conf");
        assert!(matches!(missing, Err(Error::ConfigFile { .. })));
    }
}
