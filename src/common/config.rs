//! Configuration for ringkv components

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Global configuration, optionally loaded from a TOML file and then
/// overridden by CLI flags in the binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Master-specific config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<MasterConfig>,

    /// Node-specific config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeConfig>,
}

/// Master configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_master_bind")]
    pub bind_addr: SocketAddr,
}

/// Storage node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Bind address for the storage RPC service
    #[serde(default = "default_node_bind")]
    pub bind_addr: SocketAddr,

    /// Master HTTP address, e.g. "http://127.0.0.1:8000"
    #[serde(default = "default_master_addr")]
    pub master_addr: String,

    /// Root directory for local storage; each node stores under
    /// `<data_dir>/<node_id>`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Fixed node identity. When set, the node survives restarts under the
    /// same ID and closes (rather than destroys) its storage on shutdown.
    #[serde(default)]
    pub node_id: Option<String>,
}

fn default_master_bind() -> SocketAddr {
    "0.0.0.0:8000".parse().unwrap()
}

fn default_node_bind() -> SocketAddr {
    "0.0.0.0:9000".parse().unwrap()
}

fn default_master_addr() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_master_bind(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_node_bind(),
            master_addr: default_master_addr(),
            data_dir: default_data_dir(),
            node_id: None,
        }
    }
}

impl Config {
    /// Load configuration from `ringkv.toml` (or the file named by
    /// `RINGKV_CONFIG`) if present; defaults otherwise.
    pub fn load() -> Self {
        let path = std::env::var("RINGKV_CONFIG").unwrap_or_else(|_| "ringkv".to_string());
        let loaded = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .build()
            .and_then(|c| c.try_deserialize());

        match loaded {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::debug!("config file not loaded ({}), using defaults", e);
                Self::default()
            }
        }
    }
}
