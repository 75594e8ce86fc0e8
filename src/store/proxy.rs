use super::local::LocalStore;
use super::{Store, StoreError};
use crate::pb::url_store_client::UrlStoreClient;
use crate::pb::{GetRequest, PutRequest};
use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

/// Cache-and-forward façade over a remote master.
///
/// Reads are answered from the local cache when possible; misses and all
/// writes go to the master, and every successful round trip back-fills the
/// cache. The cache is a lazily-filled subset of the master's data and is
/// never consulted for writes. Keys are never rebound, so no invalidation is
/// needed.
pub struct ProxyStore {
    cache: LocalStore,
    client: UrlStoreClient<Channel>,
}

impl ProxyStore {
    /// Connect to the master at `addr` (e.g. "http://10.0.0.1:4000").
    ///
    /// The connection is established lazily: an unreachable master does not
    /// fail construction, it surfaces as `RemoteUnavailable` on the first
    /// operation that needs it.
    pub fn connect_lazy(addr: &str) -> Result<Self, StoreError> {
        let endpoint = Endpoint::from_shared(addr.to_string())
            .map_err(|e| StoreError::Internal(format!("invalid master address {addr}: {e}")))?;
        Ok(Self {
            cache: LocalStore::ephemeral(),
            client: UrlStoreClient::new(endpoint.connect_lazy()),
        })
    }

    /// Number of entries currently cached. Observational only.
    pub async fn cached(&self) -> usize {
        self.cache.count().await
    }
}

fn map_status(status: Status, key: &str) -> StoreError {
    match status.code() {
        Code::NotFound => StoreError::NotFound(key.to_string()),
        Code::AlreadyExists => StoreError::AlreadyExists(status.message().to_string()),
        _ => StoreError::RemoteUnavailable(status.to_string()),
    }
}

#[async_trait]
impl Store for ProxyStore {
    async fn put(&self, url: &str) -> Result<String, StoreError> {
        // The proxy never derives keys itself; the master is authoritative.
        let mut client = self.client.clone();
        let resp = client
            .put(PutRequest {
                url: url.to_string(),
            })
            .await
            .map_err(|s| map_status(s, url))?;
        let key = resp.into_inner().key;

        self.cache.set(&key, url).await?;
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<String, StoreError> {
        // Cache hit: answer locally, no remote round trip.
        if let Ok(url) = self.cache.get(key).await {
            return Ok(url);
        }

        let mut client = self.client.clone();
        let resp = client
            .get(GetRequest {
                key: key.to_string(),
            })
            .await
            .map_err(|s| map_status(s, key))?;
        let url = resp.into_inner().url;

        // Fill the cache before answering so the next lookup stays local.
        // Two concurrent misses both reach here; the second set is a no-op
        // on the identical pair.
        self.cache.set(key, &url).await?;
        Ok(url)
    }
}
