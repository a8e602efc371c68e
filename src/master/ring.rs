//! Consistent-hash ring
//!
//! Node positions live in a single sequence sorted in descending hash
//! order. Placement scans that sequence for the first position at or below
//! the key's hash; when replication is on, the two following sequence
//! entries complete the replica set, so the walk moves toward smaller
//! hashes and wraps back to the largest. That direction is part of the
//! placement contract: clients observe it through where their keys land,
//! so it must not be rewritten as a conventional clockwise walk.

use crate::common::key_hash;
use std::collections::HashMap;

/// Opaque node identifier, unique within the cluster.
pub type NodeId = String;

/// Slots in a replica set.
pub const REPLICA_SLOTS: usize = 3;

/// The up-to-three nodes responsible for a key. Unused slots hold the
/// empty-string sentinel.
pub type ReplicaSet = [NodeId; REPLICA_SLOTS];

#[derive(Debug, Default)]
pub struct HashRing {
    /// Node hashes, descending.
    sorted_hashes: Vec<u32>,
    /// Node hash back to its ID.
    hash_map: HashMap<u32, NodeId>,
    /// Whether multi-replica placement is active.
    replicated: bool,
}

impl HashRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sorted_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_hashes.is_empty()
    }

    pub fn is_replicated(&self) -> bool {
        self.replicated
    }

    pub fn set_replicated(&mut self, on: bool) {
        self.replicated = on;
    }

    /// Insert a node at its hash position. The registry filters out IDs
    /// that are already members before calling, so no dedup happens here.
    pub fn add_node(&mut self, id: &str) {
        let node_hash = key_hash(id);
        self.hash_map.insert(node_hash, id.to_string());

        self.sorted_hashes.push(node_hash);
        self.sorted_hashes.sort_unstable_by(|a, b| b.cmp(a));
    }

    /// Remove a node's hash position. First match by equality; node hashes
    /// are effectively unique.
    pub fn remove_node(&mut self, id: &str) {
        let node_hash = key_hash(id);
        self.hash_map.remove(&node_hash);

        if let Some(pos) = self.sorted_hashes.iter().position(|&h| h == node_hash) {
            self.sorted_hashes.remove(pos);
        }
    }

    /// Resolve the replica set for a key.
    ///
    /// With replication off only slot 0 is filled. With replication on,
    /// slots 1 and 2 take the next two sequence entries after the match,
    /// modulo the ring size; a key hashing above every node wraps to the
    /// front of the sequence. With fewer than three nodes the modulo wrap
    /// can repeat a node across slots (degraded replication, accepted).
    pub fn replica_set(&self, key: &str) -> ReplicaSet {
        self.replica_set_at(key_hash(key))
    }

    fn replica_set_at(&self, hash: u32) -> ReplicaSet {
        let mut hosts = ReplicaSet::default();

        if self.sorted_hashes.is_empty() {
            return hosts;
        }

        if self.replicated {
            let n = self.sorted_hashes.len();
            let start = self
                .sorted_hashes
                .iter()
                .position(|&h| hash >= h)
                .unwrap_or(0);

            for (slot, offset) in hosts.iter_mut().zip(0..REPLICA_SLOTS) {
                let node_hash = self.sorted_hashes[(start + offset) % n];
                *slot = self.hash_map.get(&node_hash).cloned().unwrap_or_default();
            }
            return hosts;
        }

        let node_hash = self
            .sorted_hashes
            .iter()
            .find(|&&h| hash >= h)
            .copied()
            .unwrap_or(self.sorted_hashes[0]);
        hosts[0] = self.hash_map.get(&node_hash).cloned().unwrap_or_default();
        hosts
    }

    /// Single-node placement: the first position at or below the key's
    /// hash, wrapping to the largest position. `None` on an empty ring.
    pub fn node_for(&self, key: &str) -> Option<NodeId> {
        self.node_for_at(key_hash(key))
    }

    fn node_for_at(&self, hash: u32) -> Option<NodeId> {
        if self.sorted_hashes.is_empty() {
            return None;
        }

        let node_hash = self
            .sorted_hashes
            .iter()
            .find(|&&h| hash >= h)
            .copied()
            .unwrap_or(self.sorted_hashes[0]);
        self.hash_map.get(&node_hash).cloned()
    }
}
