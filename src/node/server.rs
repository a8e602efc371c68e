//! Storage node server
//!
//! Lifecycle: resolve identity, open local storage, register with the
//! master, serve the storage RPC service until a termination signal, then
//! close or destroy storage and tell the master we left. A configured ID
//! means persistent identity (storage survives); a generated one means an
//! ephemeral node whose data dies with it.

use crate::common::{shutdown_signal, Error, NodeConfig, Result};
use crate::node::grpc::NodeStorageService;
use crate::node::store::KvStore;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

pub struct NodeServer {
    config: NodeConfig,
}

impl NodeServer {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        let (node_id, persistent) = match &self.config.node_id {
            Some(id) => (id.clone(), true),
            None => (Uuid::new_v4().to_string(), false),
        };

        let data_dir = self.config.data_dir.join(&node_id);

        tracing::info!("starting storage node: {}", node_id);
        tracing::info!("  RPC API: {}", self.config.bind_addr);
        tracing::info!("  master: {}", self.config.master_addr);
        tracing::info!("  storage: {}", data_dir.display());

        let store = Arc::new(RwLock::new(KvStore::open(&data_dir)?));

        // Registration is mandatory: a node the master doesn't know about
        // serves no traffic, so failure here is fatal.
        join_cluster(
            &self.config.master_addr,
            &node_id,
            self.config.bind_addr.port(),
        )
        .await?;
        tracing::info!("joined master at {}", self.config.master_addr);

        let service = NodeStorageService::new(store.clone());
        tracing::info!("✓ storage node ready");

        tonic::transport::Server::builder()
            .add_service(service.into_server())
            .serve_with_shutdown(self.config.bind_addr, shutdown_signal())
            .await
            .map_err(|e| Error::Internal(format!("RPC server: {}", e)))?;

        {
            let store = store.read().unwrap();
            if persistent {
                store.close()?;
            } else {
                store.destroy()?;
            }
        }

        // Best effort: the master marks us Failed on the next dial anyway
        // if this never arrives.
        if let Err(e) = leave_cluster(&self.config.master_addr, &node_id).await {
            tracing::warn!("leave call failed: {}", e);
        } else {
            tracing::info!("left master at {}", self.config.master_addr);
        }

        tracing::info!("storage node stopped");
        Ok(())
    }
}

async fn join_cluster(master_addr: &str, id: &str, port: u16) -> Result<()> {
    let url = format!("{}/join", master_addr.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .query(&[("id", id.to_string()), ("port", port.to_string())])
        .send()
        .await
        .map_err(|e| Error::Http(format!("join: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::Http(format!("join rejected: {}", response.status())));
    }
    Ok(())
}

async fn leave_cluster(master_addr: &str, id: &str) -> Result<()> {
    let url = format!("{}/leave", master_addr.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .query(&[("id", id)])
        .send()
        .await
        .map_err(|e| Error::Http(format!("leave: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::Http(format!(
            "leave rejected: {}",
            response.status()
        )));
    }
    Ok(())
}
