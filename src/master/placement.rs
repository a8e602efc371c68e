//! Placement cache
//!
//! Maps a key's hash to the replica set that was selected when the key was
//! last SET. Reads, updates, and deletes consume this record instead of
//! re-asking the ring, so a key keeps the placement it was written with
//! even after the topology changes; a stale entry surfaces as per-replica
//! RPC failures, not as a re-route.

use crate::master::ring::ReplicaSet;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct PlacementCache {
    entries: DashMap<u32, ReplicaSet>,
}

impl PlacementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replica set recorded for a key hash, if the key was ever stored.
    pub fn lookup(&self, key_hash: u32) -> Option<ReplicaSet> {
        self.entries.get(&key_hash).map(|e| e.value().clone())
    }

    /// Record the placement chosen at SET time. Last write wins.
    pub fn record(&self, key_hash: u32, replicas: ReplicaSet) {
        self.entries.insert(key_hash, replicas);
    }

    /// Drop the record after a successful DELETE.
    pub fn forget(&self, key_hash: u32) {
        self.entries.remove(&key_hash);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
