//! Dispatch entry point.
//!
//! # Responsibilities
//! - Validate the selector headers
//! - Resolve the binding from the explicit `BindingTable`
//! - Check the binding's capability against the claimed module
//! - Delegate to the module handler and map failures to HTTP status
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) binding lookup via HashMap
//! - SERVICE envelopes use the plain JSON codec, every other module the
//!   extended one

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::bindings::{BindingTable, Module};
use crate::codec::{Codec, DEFAULT_MAX_HEADER_BYTES};
use crate::handlers;
use crate::http::request_id;
use crate::observability::metrics;
use crate::routing::matcher::{check_capability, Selector};
use crate::routing::DispatchError;

/// Routes dispatch requests to bindings.
#[derive(Debug, Clone)]
pub struct Router {
    table: Arc<BindingTable>,
    extended: Codec,
    plain: Codec,
}

impl Router {
    pub fn new(table: Arc<BindingTable>) -> Self {
        Self::with_max_header_bytes(table, DEFAULT_MAX_HEADER_BYTES)
    }

    pub fn with_max_header_bytes(table: Arc<BindingTable>, max: usize) -> Self {
        Self {
            table,
            extended: Codec::extended().with_max_header_bytes(max),
            plain: Codec::plain().with_max_header_bytes(max),
        }
    }

    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    fn codec_for(&self, module: Module) -> &Codec {
        match module {
            Module::Service => &self.plain,
            _ => &self.extended,
        }
    }

    /// Handle one dispatch request. Never fails; errors become responses.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request_id(request.headers()).to_string();

        let selector = match Selector::from_headers(request.headers()) {
            Ok(s) => s,
            Err(e) => return self.reject(e, None, &request_id, start),
        };
        let claimed = selector.module.parse::<Module>().ok();
        let Some(binding) = self.table.get(&selector.name) else {
            let err = DispatchError::UnknownBinding(selector.name.clone());
            return self.reject(err, claimed, &request_id, start);
        };
        let module = match check_capability(&selector, binding) {
            Ok(m) => m,
            Err(e) => return self.reject(e, claimed, &request_id, start),
        };

        let envelope = handlers::decode_envelope(self.codec_for(module), module, request.headers());
        let operation = envelope
            .operation()
            .unwrap_or(metrics::UNKNOWN_OPERATION)
            .to_string();

        tracing::debug!(
            request_id = %request_id,
            module = %module,
            binding = %selector.name,
            operation = %operation,
            "Dispatching"
        );

        let (response, accepted) = match handlers::invoke(binding, envelope, request).await {
            Ok(response) => (response, true),
            Err(e) => {
                if e.status().is_server_error() {
                    tracing::error!(
                        request_id = %request_id,
                        module = %module,
                        binding = %selector.name,
                        operation = %operation,
                        error = %e,
                        "Binding call failed"
                    );
                } else {
                    tracing::warn!(
                        request_id = %request_id,
                        module = %module,
                        operation = %operation,
                        error = %e,
                        "Dispatch rejected"
                    );
                }
                let accepted = !e.is_unsupported();
                (e.into_response(), accepted)
            }
        };

        let label = accepted.then_some(operation.as_str());
        metrics::record_dispatch(Some(module), label, response.status().as_u16(), start);
        response
    }

    fn reject(
        &self,
        err: DispatchError,
        module: Option<Module>,
        request_id: &str,
        start: Instant,
    ) -> Response {
        tracing::warn!(request_id = %request_id, error = %err, "Dispatch rejected");
        let response = err.into_response();
        metrics::record_dispatch(module, None, response.status().as_u16(), start);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers;
    use crate::memory::{MemoryKv, MemoryObjectStore};
    use axum::http::StatusCode;

    fn router() -> Router {
        let table = BindingTable::builder()
            .r2("BUCKET", Arc::new(MemoryObjectStore::new()))
            .kv("CACHE", Arc::new(MemoryKv::new()))
            .build();
        Router::new(Arc::new(table))
    }

    fn request(module: &str, name: &str, dispatch: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/")
            .header(headers::BINDING_MODULE, module)
            .header(headers::BINDING_NAME, name);
        if let Some(d) = dispatch {
            builder = builder.header(headers::R2_DISPATCH, d);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_selector_and_binding_errors() {
        let router = router();

        let missing = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(router.dispatch(missing).await.status(), StatusCode::BAD_REQUEST);

        let unknown = router.dispatch(request("R2", "NOPE", None)).await;
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

        let bogus = router.dispatch(request("BOGUS", "BUCKET", None)).await;
        assert_eq!(bogus.status(), StatusCode::NOT_FOUND);

        let mismatch = router.dispatch(request("KV", "BUCKET", None)).await;
        assert_eq!(mismatch.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unsupported_and_malformed_envelopes() {
        let router = router();
        let rename = Codec::extended().encode("rename", &[]).unwrap();
        let response = router.dispatch(request("R2", "BUCKET", Some(&rename))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "R2.rename() is not supported.");

        let garbage = router.dispatch(request("R2", "BUCKET", Some("{not json"))).await;
        assert_eq!(garbage.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_binding_failure_is_500_with_message() {
        let router = router();
        let list = Codec::extended()
            .encode("list", &[crate::codec::ObjectBuilder::new().field("limit", 5000u32).build()])
            .unwrap();
        let response = router.dispatch(request("R2", "BUCKET", Some(&list))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[headers::ERROR_KIND], "INVALID_ARGUMENT");
        assert!(text(response).await.contains("list limit"));
    }

    #[test]
    fn test_metric_labels_ignore_client_chosen_names() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let router = router();

        ::metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let head = Codec::extended().encode("head", &["k".into()]).unwrap();
                let made_up = Codec::extended().encode("frobnicate_12345", &[]).unwrap();
                router.dispatch(request("R2", "BUCKET", Some(&head))).await;
                router.dispatch(request("R2", "BUCKET", Some(&made_up))).await;
                router.dispatch(request("TOTALLY_BOGUS_MODULE", "BUCKET", None)).await;
                router.dispatch(request("NOT_A_MODULE", "NOPE", None)).await;
            });
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"operation="head""#));
        assert!(rendered.contains(r#"module="R2""#));
        assert!(rendered.contains(r#"module="-""#));
        assert!(!rendered.contains("frobnicate_12345"));
        assert!(!rendered.contains("TOTALLY_BOGUS_MODULE"));
        assert!(!rendered.contains("NOT_A_MODULE"));
    }
}
