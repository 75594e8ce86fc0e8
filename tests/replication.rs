//! Master/proxy replication over a real in-process gRPC server.

use shorty::pb::url_store_server::UrlStoreServer;
use shorty::{LocalStore, ProxyStore, Store, StoreError, UrlStoreService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;

async fn spawn_master(store: Arc<dyn Store>) -> (SocketAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let svc = UrlStoreService::new(store);
    let task = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(UrlStoreServer::new(svc))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    (addr, task)
}

#[tokio::test]
async fn put_goes_to_master_and_fills_the_cache() {
    let master = Arc::new(LocalStore::ephemeral());
    let (addr, server) = spawn_master(master.clone()).await;

    let proxy = ProxyStore::connect_lazy(&format!("http://{addr}")).unwrap();
    let key = proxy.put("http://example.com").await.unwrap();

    // The master is authoritative for the binding...
    assert_eq!(master.get(&key).await.unwrap(), "http://example.com");
    // ...and the successful round trip populated the proxy cache.
    assert_eq!(proxy.cached().await, 1);

    server.abort();
}

#[tokio::test]
async fn get_miss_consults_master_and_back_fills() {
    let master = Arc::new(LocalStore::ephemeral());
    let key = master.put("http://x.com").await.unwrap();
    let (addr, server) = spawn_master(master.clone()).await;

    let proxy = ProxyStore::connect_lazy(&format!("http://{addr}")).unwrap();
    assert_eq!(proxy.cached().await, 0);

    assert_eq!(proxy.get(&key).await.unwrap(), "http://x.com");
    assert_eq!(proxy.cached().await, 1);

    // A cache hit is answered without the master: stop the server and the
    // same lookup still succeeds.
    server.abort();
    assert_eq!(proxy.get(&key).await.unwrap(), "http://x.com");
}

#[tokio::test]
async fn unknown_key_propagates_not_found() {
    let master = Arc::new(LocalStore::ephemeral());
    let (addr, server) = spawn_master(master).await;

    let proxy = ProxyStore::connect_lazy(&format!("http://{addr}")).unwrap();
    let err = proxy.get("0123456789abcdef0123").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(proxy.cached().await, 0);

    server.abort();
}

#[tokio::test]
async fn unreachable_master_constructs_but_fails_at_call_time() {
    // Nothing listens here; construction must still succeed.
    let proxy = ProxyStore::connect_lazy("http://127.0.0.1:1").unwrap();

    let err = proxy.get("0123456789abcdef0123").await.unwrap_err();
    assert!(matches!(err, StoreError::RemoteUnavailable(_)));

    let err = proxy.put("http://example.com").await.unwrap_err();
    assert!(matches!(err, StoreError::RemoteUnavailable(_)));
    assert_eq!(proxy.cached().await, 0);
}

#[tokio::test]
async fn write_through_proxy_is_durable_on_the_master() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("master.journal");

    let master = Arc::new(LocalStore::open(&path, 64).await.unwrap());
    let (addr, server) = spawn_master(master.clone()).await;

    let proxy = ProxyStore::connect_lazy(&format!("http://{addr}")).unwrap();
    let key = proxy.put("http://durable.example.com").await.unwrap();

    server.abort();
    master.close().await.unwrap();

    let restarted = LocalStore::open(&path, 64).await.unwrap();
    assert_eq!(
        restarted.get(&key).await.unwrap(),
        "http://durable.example.com"
    );
}
