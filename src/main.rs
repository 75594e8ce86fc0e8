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

use clap::Parser;
use shorty::config::Config;
use shorty::observability::tracing_setup;
use shorty::server::{ConnectionManager, GrpcConnectionManager, HttpConnectionManager};
use shorty::store::{LocalStore, ProxyStore, Store};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "shorty")]
#[command(about = "URL-shortening key-value store with durable journaling and master/proxy replication", long_about = None)]
struct Args {
    /// HTTP listen address (e.g. 127.0.0.1:3000)
    #[arg(long)]
    http: Option<String>,

    /// Expose the store to proxy nodes over gRPC
    #[arg(long)]
    rpc: bool,

    /// gRPC listen address (e.g. 127.0.0.1:4000)
    #[arg(long)]
    rpc_listen: Option<String>,

    /// Master gRPC address; when set this node runs as a caching proxy
    #[arg(long)]
    master: Option<String>,

    /// Journal file path
    #[arg(long)]
    file: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_setup::init_tracing_from_env();

    let args = Args::parse();

    let cfg = Config::load_or_default(&args.config)?;

    // Command line args override config file
    let http_addr: SocketAddr = args.http.as_ref().unwrap_or(&cfg.http_addr).parse()?;
    let rpc_addr: SocketAddr = args.rpc_listen.as_ref().unwrap_or(&cfg.rpc_addr).parse()?;
    let rpc_enabled = args.rpc || cfg.rpc_enabled;
    let master_addr = args.master.or(cfg.master_addr);
    let data_file = args.file.unwrap_or(cfg.storage.data_file);

    let store: Arc<dyn Store> = match master_addr {
        Some(addr) => {
            tracing::info!(master = %addr, "running as proxy");
            Arc::new(ProxyStore::connect_lazy(&addr)?)
        }
        None => {
            tracing::info!(journal = %data_file, "running as master");
            let store = LocalStore::open(&data_file, cfg.storage.queue_depth).await?;
            tracing::info!(count = store.count().await, "store loaded");
            Arc::new(store)
        }
    };

    if rpc_enabled {
        let grpc = GrpcConnectionManager::new(store.clone());
        tokio::spawn(async move {
            if let Err(e) = grpc.serve(rpc_addr).await {
                tracing::error!(error = %e, "gRPC server exited");
            }
        });
    }

    HttpConnectionManager::new(store)
        .serve(http_addr)
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;
    Ok(())
}
