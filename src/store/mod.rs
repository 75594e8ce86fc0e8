use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod journal;
pub mod local;
pub mod proxy;

pub use local::LocalStore;
pub use proxy::ProxyStore;

/// Persisted unit: one accepted key→url binding. Append-only, never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),
    /// The key is already bound to a different url. With a deterministic key
    /// derivation this means two distinct urls hashed to the same short key.
    #[error("key already bound to a different url: {0}")]
    AlreadyExists(String),
    /// The journal writer task is gone, so the mutation cannot be made durable.
    #[error("journal queue closed")]
    QueueClosed,
    #[error("master unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Capability set shared by the local store and the replicating proxy.
///
/// The serving layers (gRPC service, HTTP handlers) depend only on this trait
/// via `Arc<dyn Store>`; deployment role decides the concrete implementation.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Derive (or forward derivation of) the short key for `url` and bind it.
    /// Repeated puts of the same url return the same key without error.
    async fn put(&self, url: &str) -> Result<String, StoreError>;

    /// Resolve a previously stored key back to its url.
    async fn get(&self, key: &str) -> Result<String, StoreError>;
}
