// Copyright PingCAP Inc. 2025.
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; version 2 of the License.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use crate::http::HttpHandler;
use crate::pb::url_store_server::UrlStoreServer;
use crate::service::UrlStoreService;
use crate::store::Store;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;

#[async_trait]
pub trait ConnectionManager: Send + Sync + 'static {
    async fn serve(&self, addr: SocketAddr)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// gRPC connection manager (tonic) that hosts the UrlStore service for
/// proxy nodes.
#[derive(Clone)]
pub struct GrpcConnectionManager {
    svc: UrlStoreService,
}

impl GrpcConnectionManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            svc: UrlStoreService::new(store),
        }
    }
}

#[async_trait]
impl ConnectionManager for GrpcConnectionManager {
    async fn serve(
        &self,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("Starting gRPC server on {}", addr);
        tonic::transport::Server::builder()
            .add_service(UrlStoreServer::new(self.svc.clone()))
            .serve(addr)
            .await?;
        Ok(())
    }
}

/// HTTP connection manager using Axum.
#[derive(Clone)]
pub struct HttpConnectionManager {
    handler: HttpHandler,
}

impl HttpConnectionManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            handler: HttpHandler::new(store),
        }
    }
}

#[async_trait]
impl ConnectionManager for HttpConnectionManager {
    async fn serve(
        &self,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("Starting HTTP server on {}", addr);
        let app = self.handler.clone().router();

        use socket2::{Domain, Protocol, Socket, Type};

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

        // Redirect responses are tiny; Nagle only adds latency here.
        socket.set_nodelay(true)?;
        socket.set_reuse_address(true)?;

        socket.bind(&addr.into())?;
        socket.listen(1024)?;
        socket.set_nonblocking(true)?;

        let listener = tokio::net::TcpListener::from_std(socket.into())?;

        axum::serve(listener, app).await?;
        Ok(())
    }
}
