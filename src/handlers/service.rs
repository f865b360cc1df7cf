//! SERVICE (inter-service fetch) handler.

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Uri};
use axum::response::Response;

use crate::bindings::{BindingError, Fetcher, Module};
use crate::codec::Envelope;
use crate::headers;
use crate::routing::DispatchError;

/// Rebuild the caller's original request: original URL, same method and
/// body, bridge headers removed.
pub fn restore_request(request: Request<Body>, url: &str) -> Result<Request<Body>, BindingError> {
    let uri: Uri = url
        .parse()
        .map_err(|e| BindingError::invalid_argument(format!("invalid service URL '{url}': {e}")))?;

    let (mut parts, body) = request.into_parts();
    let bridge_headers: Vec<_> = parts
        .headers
        .keys()
        .filter(|name| headers::is_bridge_header(name))
        .cloned()
        .collect();
    for name in bridge_headers {
        parts.headers.remove(name);
    }
    match uri.authority().and_then(|a| HeaderValue::from_str(a.as_str()).ok()) {
        Some(host) => {
            parts.headers.insert(header::HOST, host);
        }
        None => {
            parts.headers.remove(header::HOST);
        }
    }
    parts.uri = uri;
    Ok(Request::from_parts(parts, body))
}

pub async fn handle(
    fetcher: &dyn Fetcher,
    envelope: Envelope,
    request: Request<Body>,
) -> Result<Response, DispatchError> {
    let (operation, mut params) = envelope.into_parts();
    match operation.as_deref() {
        Some("fetch") => {
            let url: String = params.take(0)?;
            let original = restore_request(request, &url)?;
            Ok(fetcher.fetch(original).await?)
        }
        _ => Err(DispatchError::unsupported(Module::Service, operation)),
    }
}
