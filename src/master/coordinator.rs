//! Request coordinator
//!
//! Every client operation runs the same pipeline: resolve a replica set,
//! fan RPC calls out to its members one at a time, aggregate under the
//! at-least-one-of-three policy, respond. Reads stop at the first replica
//! that answers; writes count acks across all eligible replicas. A dial
//! failure marks the node Failed and moves on; a failure of the call
//! itself is absorbed without touching the node's status. Only when every
//! replica falls through does the client see an error.

use crate::common::{key_hash, Error, Result};
use crate::master::cluster::{Cluster, Node, Status};
use crate::master::node_client::NodeClient;
use crate::master::placement::PlacementCache;
use crate::master::ring::ReplicaSet;
use std::net::IpAddr;

pub struct Coordinator {
    cluster: Cluster,
    placement: PlacementCache,
}

/// Mutating calls share one fan-out loop; this selects the RPC.
#[derive(Clone, Copy)]
enum WriteOp<'a> {
    Set(&'a [u8]),
    Update(&'a [u8]),
    Del,
}

impl WriteOp<'_> {
    fn name(&self) -> &'static str {
        match self {
            WriteOp::Set(_) => "SET",
            WriteOp::Update(_) => "UPDATE",
            WriteOp::Del => "DELETE",
        }
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            cluster: Cluster::new(),
            placement: PlacementCache::new(),
        }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// Read a key from the replica set recorded at write time. First
    /// responder wins; replicas after it are never consulted.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let Some(replicas) = self.placement.lookup(key_hash(key)) else {
            tracing::debug!("GET({}): no recorded placement", key);
            return Err(Error::KeyNotFound(key.to_string()));
        };
        self.log_replicas("GET", key, &replicas);

        for node in self.eligible(&replicas) {
            let mut client = match NodeClient::dial(node.rpc_addr()).await {
                Ok(client) => client,
                Err(e) => {
                    tracing::warn!("failed to connect to node {}: {}", node.rpc_addr(), e);
                    node.mark_failed();
                    continue;
                }
            };

            match client.get(key.as_bytes()).await {
                Ok(value) => {
                    tracing::debug!("GET({}) served by {}", key, node.rpc_addr());
                    return Ok(value);
                }
                // The node answered the dial but not the call; that is not
                // node death, so its status stays as it was.
                Err(_) => continue,
            }
        }

        Err(Error::KeyNotFound(key.to_string()))
    }

    /// Write a key. Placement is recomputed from the ring on every SET and
    /// recorded in the cache only once at least one replica has the value.
    pub async fn set(&self, key: &str, value: &[u8]) -> Result<usize> {
        let replicas = self.cluster.replica_set(key);
        self.log_replicas("SET", key, &replicas);

        let acked = self.replicate(&replicas, key, WriteOp::Set(value)).await;
        if acked == 0 {
            tracing::warn!("SET({}) failed: no replica accepted", key);
            return Err(Error::ReplicationFailed(key.to_string()));
        }

        self.placement.record(key_hash(key), replicas);
        Ok(acked)
    }

    /// Overwrite an existing key on the replicas it was stored on. The
    /// recorded placement is consumed, never modified.
    pub async fn update(&self, key: &str, value: &[u8]) -> Result<usize> {
        let Some(replicas) = self.placement.lookup(key_hash(key)) else {
            tracing::debug!("UPDATE({}): no recorded placement", key);
            return Err(Error::KeyNotFound(key.to_string()));
        };
        self.log_replicas("UPDATE", key, &replicas);

        let acked = self.replicate(&replicas, key, WriteOp::Update(value)).await;
        if acked == 0 {
            tracing::warn!("UPDATE({}) failed: no replica accepted", key);
            return Err(Error::ReplicationFailed(key.to_string()));
        }
        Ok(acked)
    }

    /// Remove a key from its recorded replicas, and the record with it. An
    /// unknown key issues no RPC at all.
    pub async fn delete(&self, key: &str) -> Result<usize> {
        let Some(replicas) = self.placement.lookup(key_hash(key)) else {
            tracing::debug!("DELETE({}): no recorded placement", key);
            return Err(Error::KeyNotFound(key.to_string()));
        };
        self.log_replicas("DELETE", key, &replicas);

        let acked = self.replicate(&replicas, key, WriteOp::Del).await;
        if acked == 0 {
            tracing::warn!("DELETE({}) failed: no replica accepted", key);
            return Err(Error::ReplicationFailed(key.to_string()));
        }

        self.placement.forget(key_hash(key));
        Ok(acked)
    }

    pub fn join(&self, id: &str, ip: IpAddr, port: u16) {
        self.cluster.join(id, ip, port);
    }

    pub fn leave(&self, id: &str) {
        self.cluster.leave(id);
    }

    /// Fan a write out to every eligible replica, sequentially, and count
    /// acks. Replicas are never retried; latency is the sum of the calls.
    async fn replicate(&self, replicas: &ReplicaSet, key: &str, op: WriteOp<'_>) -> usize {
        let mut acked = 0;

        for node in self.eligible(replicas) {
            let mut client = match NodeClient::dial(node.rpc_addr()).await {
                Ok(client) => client,
                Err(e) => {
                    tracing::warn!("failed to connect to node {}: {}", node.rpc_addr(), e);
                    node.mark_failed();
                    continue;
                }
            };

            let outcome = match op {
                WriteOp::Set(value) => client.set(key.as_bytes(), value).await,
                WriteOp::Update(value) => client.update(key.as_bytes(), value).await,
                WriteOp::Del => client.del(key.as_bytes()).await,
            };

            match outcome {
                Ok(true) => {
                    acked += 1;
                    tracing::debug!("{}({}) acked by {}", op.name(), key, node.rpc_addr());
                }
                Ok(false) => {
                    tracing::debug!("{}({}) refused by {}", op.name(), key, node.rpc_addr());
                }
                Err(_) => continue,
            }
        }

        acked
    }

    /// Resolve the non-sentinel, non-Failed members of a replica set. A
    /// slot whose node has left the registry since placement was recorded
    /// is skipped the same way a sentinel is.
    fn eligible(&self, replicas: &ReplicaSet) -> Vec<Node> {
        replicas
            .iter()
            .filter(|id| !id.is_empty())
            .filter_map(|id| self.cluster.node(id))
            .filter(|node| node.status() != Status::Failed)
            .collect()
    }

    fn log_replicas(&self, op: &str, key: &str, replicas: &ReplicaSet) {
        for id in replicas.iter().filter(|id| !id.is_empty()) {
            match self.cluster.node(id) {
                Some(node) => {
                    tracing::debug!("{}({}) -> [{}]({})", op, key, node.rpc_addr(), id)
                }
                None => tracing::debug!("{}({}) -> [gone]({})", op, key, id),
            }
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn test_get_unknown_key() {
        let coordinator = Coordinator::new();
        let err = coordinator.get("missing").await.unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_unknown_key_issues_no_rpc() {
        // No members at all: if delete tried any RPC it would error on
        // connection, not on the missing placement record.
        let coordinator = Coordinator::new();
        let err = coordinator.delete("missing").await.unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_key() {
        let coordinator = Coordinator::new();
        let err = coordinator.update("missing", b"v").await.unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_with_no_members() {
        let coordinator = Coordinator::new();
        let err = coordinator.set("k", b"v").await.unwrap_err();
        assert!(matches!(err, Error::ReplicationFailed(_)));
        // Failed SET must not record placement.
        let err = coordinator.get("k").await.unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_dial_failure_marks_node_failed() {
        let coordinator = Coordinator::new();
        // Port 1 on localhost: connection refused, promptly.
        coordinator.join("dead", IP, 1);
        assert_eq!(
            coordinator.cluster().node("dead").unwrap().status(),
            Status::Active
        );

        let err = coordinator.set("k", b"v").await.unwrap_err();
        assert!(matches!(err, Error::ReplicationFailed(_)));
        assert_eq!(
            coordinator.cluster().node("dead").unwrap().status(),
            Status::Failed
        );
    }

    #[tokio::test]
    async fn test_failed_node_is_skipped_without_dialing() {
        let coordinator = Coordinator::new();
        coordinator.join("dead", IP, 1);
        coordinator.cluster().node("dead").unwrap().mark_failed();

        // The only member is Failed, so the fan-out is empty and the SET
        // fails without any dial attempt.
        let err = coordinator.set("k", b"v").await.unwrap_err();
        assert!(matches!(err, Error::ReplicationFailed(_)));
    }

    #[test]
    fn test_eligible_skips_sentinels_and_departed() {
        let coordinator = Coordinator::new();
        coordinator.join("n1", IP, 9001);

        let replicas = ["n1".to_string(), String::new(), "departed".to_string()];
        let nodes = coordinator.eligible(&replicas);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "n1");
    }
}
