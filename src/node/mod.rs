//! Storage node implementation
//!
//! A node owns a local key-value store and exposes it to the master over
//! the storage RPC service. It registers itself with the master at
//! startup and deregisters on shutdown.

pub mod grpc;
pub mod server;
pub mod store;

pub use server::NodeServer;
