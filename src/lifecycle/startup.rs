//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn validated binding configuration into a live `BindingTable`
//! - Build the dispatch codec from configured limits
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use crate::bindings::{BindingError, BindingTable, HttpFetcher, Module};
use crate::codec::Codec;
use crate::config::{BindingConfig, BridgeConfig};
use crate::memory::{MemoryKv, MemoryObjectStore, MemoryQueue};

/// Instantiate every configured binding.
pub fn build_binding_table(bindings: &[BindingConfig]) -> Result<BindingTable, BindingError> {
    let mut builder = BindingTable::builder();
    for binding in bindings {
        let name = binding.name.clone();
        builder = match binding.module {
            Module::R2 => builder.r2(name, Arc::new(MemoryObjectStore::new())),
            Module::Kv => builder.kv(name, Arc::new(MemoryKv::new())),
            Module::Queue => builder.queue(name, Arc::new(MemoryQueue::new())),
            Module::Service => {
                let upstream = binding.upstream.as_deref().ok_or_else(|| {
                    BindingError::invalid_argument(format!("SERVICE binding '{name}' has no upstream"))
                })?;
                builder.service(name, Arc::new(HttpFetcher::new(upstream)?))
            }
            Module::D1 => {
                return Err(BindingError::invalid_argument(format!(
                    "D1 binding '{name}' must be supplied by the embedding host"
                )));
            }
        };
        tracing::debug!(binding = %binding.name, module = %binding.module, "Binding registered");
    }
    Ok(builder.build())
}

/// Extended codec honouring the configured header limit.
pub fn build_codec(config: &BridgeConfig) -> Codec {
    Codec::extended().with_max_header_bytes(config.codec.max_header_bytes)
}
