pub mod config;
pub mod http;
pub mod key;
pub mod observability;
pub mod pb;
pub mod server;
pub mod service;
pub mod store;

pub use key::generate_key;
pub use service::UrlStoreService;
pub use store::{LocalStore, ProxyStore, Record, Store, StoreError};
