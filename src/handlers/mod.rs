//! Per-module server handlers.
//!
//! # Data Flow
//! ```text
//! Router (binding resolved, capability checked)
//!     → decode_envelope (module's dispatch header → Envelope)
//!     → invoke → r2 | kv | d1 | queue | service
//!         → call the binding
//!         → shape the response: JSON, empty 200, or metadata header + body
//! ```
//!
//! # Design Decisions
//! - Envelopes decode leniently; an unreadable header becomes an empty
//!   envelope and fails later as an unsupported operation
//! - Request and response bodies are streamed, never collected, except where
//!   the binding itself takes a buffer (KV values)

pub mod d1;
pub mod kv;
pub mod queue;
pub mod r2;
pub mod service;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::Serialize;

use crate::bindings::r2::ByteStream;
use crate::bindings::{Binding, BindingError, Module};
use crate::codec::{to_ascii_json, Codec, CodecError, Envelope};
use crate::headers;
use crate::routing::DispatchError;

/// Decode the dispatch envelope `module` carries in its own header.
pub fn decode_envelope(codec: &Codec, module: Module, map: &HeaderMap) -> Envelope {
    let text = map
        .get(headers::dispatch_header(module))
        .and_then(|v| v.to_str().ok());
    codec.decode_header(text)
}

/// Invoke the operation named by `envelope` on `binding`.
pub async fn invoke(
    binding: &Binding,
    envelope: Envelope,
    request: Request<Body>,
) -> Result<Response, DispatchError> {
    match binding {
        Binding::R2(store) => r2::handle(store.as_ref(), envelope, request).await,
        Binding::Kv(kv) => kv::handle(kv.as_ref(), envelope, request).await,
        Binding::D1(db) => d1::handle(db.as_ref(), envelope).await,
        Binding::Queue(queue) => queue::handle(queue.as_ref(), envelope).await,
        Binding::Service(fetcher) => service::handle(fetcher.as_ref(), envelope, request).await,
    }
}

/// Adapt an incoming request body into a binding byte stream.
pub(crate) fn body_stream(body: Body) -> ByteStream {
    body.into_data_stream()
        .map(|chunk| chunk.map_err(std::io::Error::other))
        .boxed()
}

/// Empty 200 response.
pub(crate) fn empty() -> Response {
    StatusCode::OK.into_response()
}

/// Serialize `value` as an ASCII-only JSON header value.
pub(crate) fn json_header<T: Serialize + ?Sized>(value: &T) -> Result<HeaderValue, DispatchError> {
    let text = to_ascii_json(value).map_err(CodecError::from)?;
    HeaderValue::from_str(&text)
        .map_err(|e| DispatchError::Binding(BindingError::internal(format!("invalid header value: {e}"))))
}
