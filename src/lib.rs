//! # ringkv
//!
//! A sharded, replicated key-value cluster:
//! - One master process fronting the cluster over HTTP
//! - Consistent-hash placement onto 3-slot replica sets
//! - gRPC fan-out to storage nodes with an at-least-one success policy
//! - Membership over HTTP join/leave, replication toggled by cluster size
//!
//! ## Architecture
//!
//! ```text
//!            GET /get   POST /set   POST /update   DELETE /delete
//!                 │          │           │              │
//!           ┌─────▼──────────▼───────────▼──────────────▼─────┐
//!           │                     Master                      │
//!           │   hash ring · node registry · placement cache   │
//!           └───────────┬─────────────┬─────────────┬─────────┘
//!                       │ gRPC        │ gRPC        │ gRPC
//!                 ┌─────▼─────┐ ┌─────▼─────┐ ┌─────▼─────┐
//!                 │  Node A   │ │  Node B   │ │  Node C   │
//!                 │ (storage) │ │ (storage) │ │ (storage) │
//!                 └───────────┘ └───────────┘ └───────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start the master
//! ```bash
//! ringkv-master serve --bind 0.0.0.0:8000
//! ```
//!
//! ### Start a storage node
//! ```bash
//! ringkv-node --bind 0.0.0.0:9000 --master http://localhost:8000
//! ```
//!
//! A node started with `--id` keeps a persistent identity and closes its
//! storage on shutdown; without it the node gets a random identity per run
//! and destroys its storage when it leaves.

pub mod common;
pub mod master;
pub mod node;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use master::Master;
pub use node::NodeServer;

// Generated protobuf code
pub mod proto {
    tonic::include_proto!("ringkv");
}

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
