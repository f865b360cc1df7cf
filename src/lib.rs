//! Binding bridge library.
//!
//! Server side: build a [`BindingTable`], wrap it in a [`Router`] and serve it
//! with [`HttpServer`]. Client side: [`BridgeClient`] hands out typed proxies
//! for each hosted binding.

pub mod bindings;
pub mod client;
pub mod codec;
pub mod config;
pub mod handlers;
pub mod headers;
pub mod http;
pub mod lifecycle;
pub mod memory;
pub mod observability;
pub mod routing;

pub use bindings::{Binding, BindingTable, Module};
pub use client::BridgeClient;
pub use codec::Codec;
pub use config::BridgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Router;
