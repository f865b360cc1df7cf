//! Client proxies.
//!
//! # Data Flow
//! ```text
//! proxy method (R2Bucket::put, KvClient::get, ...)
//!     → Codec::encode(operation, params) → dispatch header
//!     → POST bridge URL (selectors + dispatch header + optional body)
//!     → status check (non-2xx → BridgeError::Remote with typed kind)
//!     → typed result (JSON, empty, or metadata header + streamed body)
//! ```
//!
//! # Design Decisions
//! - One `reqwest::Client` is shared by every proxy created from a
//!   `BridgeClient`, so connections are pooled per bridge
//! - Proxies are cheap to clone

pub mod d1;
pub mod dispatch;
pub mod kv;
pub mod queue;
pub mod r2;
pub mod service;

use url::Url;

use crate::bindings::Module;

pub use d1::{D1Database, PreparedStatement};
pub use dispatch::{BridgeError, Dispatcher};
pub use kv::KvClient;
pub use queue::QueueClient;
pub use r2::{HeadResult, ObjectBody, ObjectGet, ObjectList, PutBody, R2Bucket};
pub use service::ServiceFetcher;

/// Entry point for talking to one bridge.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    url: Url,
}

impl BridgeClient {
    /// `url` is the bridge's base URL, e.g. `http://127.0.0.1:8787/`.
    pub fn new(url: &str) -> Result<Self, BridgeError> {
        Ok(Self::with_client(reqwest::Client::new(), dispatch::parse_url(url)?))
    }

    pub fn with_client(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn dispatcher(&self, module: Module, binding: &str) -> Dispatcher {
        Dispatcher::new(self.http.clone(), self.url.clone(), module, binding)
    }

    pub fn r2(&self, binding: &str) -> R2Bucket {
        R2Bucket::new(self.dispatcher(Module::R2, binding))
    }

    pub fn kv(&self, binding: &str) -> KvClient {
        KvClient::new(self.dispatcher(Module::Kv, binding))
    }

    pub fn d1(&self, binding: &str) -> D1Database {
        D1Database::new(self.dispatcher(Module::D1, binding))
    }

    pub fn queue(&self, binding: &str) -> QueueClient {
        QueueClient::new(self.dispatcher(Module::Queue, binding))
    }

    /// SERVICE fetcher routed through this bridge.
    pub fn service(&self, binding: &str) -> ServiceFetcher {
        ServiceFetcher::through_bridge(self.dispatcher(Module::Service, binding))
    }

    /// SERVICE fetcher that bypasses the bridge.
    pub fn service_direct(&self, origin: &str) -> Result<ServiceFetcher, BridgeError> {
        ServiceFetcher::direct(self.http.clone(), origin)
    }
}
