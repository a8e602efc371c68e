//! Storage RPC service
//!
//! The four methods the master fans out to. Reads take the shared side of
//! the store lock, mutations the exclusive side. A missing key on Get is
//! a NOT_FOUND status; on Update/Del it comes back as `success: false`,
//! which the master counts as a refusal rather than a node failure.

use crate::common::Error;
use crate::node::store::KvStore;
use crate::proto::node_storage_server::{NodeStorage, NodeStorageServer};
use crate::proto::{
    DelRequest, DelResponse, GetRequest, GetResponse, SetRequest, SetResponse, UpdateRequest,
    UpdateResponse,
};
use std::sync::{Arc, RwLock};
use tonic::{Request, Response, Status};

pub struct NodeStorageService {
    store: Arc<RwLock<KvStore>>,
}

impl NodeStorageService {
    pub fn new(store: Arc<RwLock<KvStore>>) -> Self {
        Self { store }
    }

    /// Converts this service into a gRPC server instance.
    pub fn into_server(self) -> NodeStorageServer<Self> {
        NodeStorageServer::new(self)
    }
}

#[tonic::async_trait]
impl NodeStorage for NodeStorageService {
    async fn get(&self, req: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let args = req.into_inner();

        let store = self.store.read().unwrap();
        match store.get(&args.key) {
            Some(value) => Ok(Response::new(GetResponse { value })),
            None => {
                let key = String::from_utf8_lossy(&args.key).into_owned();
                Err(Error::KeyNotFound(key).to_grpc_status())
            }
        }
    }

    async fn set(&self, req: Request<SetRequest>) -> Result<Response<SetResponse>, Status> {
        let args = req.into_inner();

        self.store.write().unwrap().set(&args.key, &args.value);
        Ok(Response::new(SetResponse { success: true }))
    }

    async fn update(
        &self,
        req: Request<UpdateRequest>,
    ) -> Result<Response<UpdateResponse>, Status> {
        let args = req.into_inner();

        let success = self
            .store
            .write()
            .unwrap()
            .update(&args.key, &args.value)
            .is_ok();
        Ok(Response::new(UpdateResponse { success }))
    }

    async fn del(&self, req: Request<DelRequest>) -> Result<Response<DelResponse>, Status> {
        let args = req.into_inner();

        let success = self.store.write().unwrap().delete(&args.key).is_ok();
        Ok(Response::new(DelResponse { success }))
    }
}
