use crate::pb::url_store_server::UrlStore;
use crate::pb::{GetRequest, GetResponse, PutRequest, PutResponse};
use crate::store::{Store, StoreError};
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// gRPC service exposing the store to proxy nodes.
#[derive(Clone)]
pub struct UrlStoreService {
    store: Arc<dyn Store>,
}

impl UrlStoreService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

fn map_store_err(e: StoreError) -> Status {
    match e {
        StoreError::NotFound(key) => Status::not_found(format!("key not found: {key}")),
        StoreError::AlreadyExists(key) => {
            Status::already_exists(format!("key already bound to a different url: {key}"))
        }
        StoreError::RemoteUnavailable(m) => Status::unavailable(m),
        StoreError::QueueClosed => Status::unavailable("journal queue closed"),
        StoreError::Internal(m) => Status::internal(m),
    }
}

#[tonic::async_trait]
impl UrlStore for UrlStoreService {
    #[tracing::instrument(skip(self, req), fields(method = "put"))]
    async fn put(&self, req: Request<PutRequest>) -> Result<Response<PutResponse>, Status> {
        let url = req.into_inner().url;
        if url.is_empty() {
            return Err(Status::invalid_argument("url is required"));
        }

        let key = self.store.put(&url).await.map_err(map_store_err)?;
        Ok(Response::new(PutResponse { key }))
    }

    async fn get(&self, req: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let key = req.into_inner().key;
        if key.is_empty() {
            return Err(Status::invalid_argument("key is required"));
        }

        let url = self.store.get(&key).await.map_err(map_store_err)?;
        Ok(Response::new(GetResponse { url }))
    }
}
