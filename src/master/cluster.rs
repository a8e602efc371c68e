//! Node registry and membership
//!
//! The registry and the hash ring mutate together: one exclusive lock
//! covers both for join/leave, and every placement-consuming read takes
//! the shared side of the same lock. A node's liveness status sits outside
//! the lock entirely, as a per-node atomic flag the request coordinator
//! flips on dial failures without touching the membership list.

use crate::master::ring::{HashRing, NodeId, ReplicaSet};
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Cluster size at which a join enables replication.
pub const REPLICATION_ON_SIZE: usize = 6;
/// Cluster size at which a leave disables replication.
pub const REPLICATION_OFF_SIZE: usize = 5;

/// Node liveness as seen by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Active => write!(f, "active"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// Lock-free status cell shared between the registry's node record and any
/// clones the coordinator holds during a fan-out.
#[derive(Debug, Default)]
struct StatusCell(AtomicBool);

impl StatusCell {
    fn get(&self) -> Status {
        if self.0.load(Ordering::Relaxed) {
            Status::Failed
        } else {
            Status::Active
        }
    }

    fn set(&self, status: Status) {
        self.0.store(status == Status::Failed, Ordering::Relaxed);
    }
}

/// A cluster member. Cloning shares the status cell, so marking a clone
/// failed is visible through the registry.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub ip: IpAddr,
    pub port: u16,
    status: Arc<StatusCell>,
}

impl Node {
    fn new(id: &str, ip: IpAddr, port: u16) -> Self {
        Self {
            id: id.to_string(),
            ip,
            port,
            status: Arc::new(StatusCell::default()),
        }
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Opportunistic failure marking; taken without the registry lock.
    pub fn mark_failed(&self) {
        self.status.set(Status::Failed);
    }

    fn mark_active(&self) {
        self.status.set(Status::Active);
    }

    /// Dialable endpoint for the node's storage RPC service.
    pub fn rpc_addr(&self) -> String {
        match self.ip {
            IpAddr::V4(ip) => format!("http://{}:{}", ip, self.port),
            IpAddr::V6(ip) => format!("http://[{}]:{}", ip, self.port),
        }
    }
}

#[derive(Debug, Default)]
struct Membership {
    nodes: Vec<Node>,
    ring: HashRing,
}

/// The authoritative member list plus the ring, guarded together.
#[derive(Debug, Default)]
pub struct Cluster {
    inner: RwLock<Membership>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member, or revive it if the ID is already registered.
    /// Rejoining is the only path from Failed back to Active.
    pub fn join(&self, id: &str, ip: IpAddr, port: u16) {
        let mut m = self.inner.write().unwrap();

        if let Some(node) = m.nodes.iter().find(|n| n.id == id) {
            node.mark_active();
            tracing::info!("rejoined the cluster: {}:{} ({})", ip, port, id);
            return;
        }

        m.nodes.push(Node::new(id, ip, port));
        m.ring.add_node(id);
        tracing::info!("joined the cluster: {}:{} ({})", ip, port, id);

        if m.nodes.len() == REPLICATION_ON_SIZE {
            m.ring.set_replicated(true);
            tracing::info!("replication is enabled");
        }
    }

    /// Remove a member. Logs and falls through when the ID is unknown; the
    /// ring removal and threshold check run either way, matching the
    /// membership contract.
    pub fn leave(&self, id: &str) {
        let mut m = self.inner.write().unwrap();

        if let Some(pos) = m.nodes.iter().position(|n| n.id == id) {
            let node = m.nodes.remove(pos);
            tracing::info!(
                "left the cluster: {}:{} ({})",
                node.ip,
                node.port,
                node.id
            );
        } else {
            tracing::info!("leave for unknown node ({})", id);
        }

        m.ring.remove_node(id);

        if m.nodes.len() == REPLICATION_OFF_SIZE {
            m.ring.set_replicated(false);
            tracing::info!("replication is disabled");
        }
    }

    /// Look up a member by ID.
    pub fn node(&self, id: &str) -> Option<Node> {
        let m = self.inner.read().unwrap();
        m.nodes.iter().find(|n| n.id == id).cloned()
    }

    /// Resolve current placement for a key from the ring.
    pub fn replica_set(&self, key: &str) -> ReplicaSet {
        let m = self.inner.read().unwrap();
        m.ring.replica_set(key)
    }

    pub fn len(&self) -> usize {
        let m = self.inner.read().unwrap();
        m.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_replicated(&self) -> bool {
        let m = self.inner.read().unwrap();
        m.ring.is_replicated()
    }
}
