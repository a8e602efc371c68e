//! Thin gRPC client for a storage node
//!
//! The coordinator dials a fresh client per replica per request. The dial
//! is eager, so an unreachable node fails here rather than on the first
//! call; the coordinator treats dial failures and call failures
//! differently, and this split is what lets it tell them apart.

use crate::common::{Error, Result};
use crate::proto::node_storage_client::NodeStorageClient;
use crate::proto::{DelRequest, GetRequest, SetRequest, UpdateRequest};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

const DIAL_TIMEOUT: Duration = Duration::from_secs(3);

pub struct NodeClient {
    client: NodeStorageClient<Channel>,
}

impl NodeClient {
    pub async fn dial(addr: String) -> Result<Self> {
        let endpoint = Endpoint::from_shared(addr.clone())
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", addr, e)))?
            .connect_timeout(DIAL_TIMEOUT);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", addr, e)))?;

        Ok(Self {
            client: NodeStorageClient::new(channel),
        })
    }

    pub async fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        let response = self.client.get(GetRequest { key: key.to_vec() }).await?;
        Ok(response.into_inner().value)
    }

    pub async fn set(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        let response = self
            .client
            .set(SetRequest {
                key: key.to_vec(),
                value: value.to_vec(),
            })
            .await?;
        Ok(response.into_inner().success)
    }

    pub async fn update(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        let response = self
            .client
            .update(UpdateRequest {
                key: key.to_vec(),
                value: value.to_vec(),
            })
            .await?;
        Ok(response.into_inner().success)
    }

    pub async fn del(&mut self, key: &[u8]) -> Result<bool> {
        let response = self.client.del(DelRequest { key: key.to_vec() }).await?;
        Ok(response.into_inner().success)
    }
}
