//! Bridge wire headers.
//!
//! Header names are case-insensitive on the wire; they are kept in lowercase
//! form here so they can be used as static [`HeaderName`]s.

use axum::http::HeaderName;

use crate::bindings::Module;

/// Every bridge header starts with this prefix.
pub const BRIDGE_PREFIX: &str = "x-bridge-";

/// Selector: binding module (`KV`, `R2`, `D1`, `SERVICE`, `QUEUE`).
pub const BINDING_MODULE: HeaderName = HeaderName::from_static("x-bridge-binding-module");
/// Selector: binding name.
pub const BINDING_NAME: HeaderName = HeaderName::from_static("x-bridge-binding-name");

pub const R2_DISPATCH: HeaderName = HeaderName::from_static("x-bridge-r2-dispatch");
pub const KV_DISPATCH: HeaderName = HeaderName::from_static("x-bridge-kv-dispatch");
pub const D1_DISPATCH: HeaderName = HeaderName::from_static("x-bridge-d1-dispatch");
pub const QUEUE_DISPATCH: HeaderName = HeaderName::from_static("x-bridge-queue-dispatch");
pub const SERVICE_DISPATCH: HeaderName = HeaderName::from_static("x-bridge-service-dispatch");

/// Object metadata accompanying a streamed R2 `get` body.
pub const R2_OBJECT_JSON: HeaderName = HeaderName::from_static("x-bridge-r2-r2objectjson");
/// Metadata accompanying a KV `get` value.
pub const KV_METADATA: HeaderName = HeaderName::from_static("x-bridge-kv-metadata");
/// Typed kind of a binding failure, sent with 500 responses.
pub const ERROR_KIND: HeaderName = HeaderName::from_static("x-bridge-error-kind");

/// Header carrying the dispatch envelope for `module`.
pub fn dispatch_header(module: Module) -> HeaderName {
    match module {
        Module::R2 => R2_DISPATCH,
        Module::Kv => KV_DISPATCH,
        Module::D1 => D1_DISPATCH,
        Module::Queue => QUEUE_DISPATCH,
        Module::Service => SERVICE_DISPATCH,
    }
}

/// True for headers added by the bridge itself.
pub fn is_bridge_header(name: &HeaderName) -> bool {
    name.as_str().starts_with(BRIDGE_PREFIX)
}
