//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler on every path and method
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Hand requests to the dispatch router
//! - Stop gracefully when the shutdown coordinator fires

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::request::request_id;
use crate::lifecycle::Shutdown;
use crate::routing::Router as DispatchRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<DispatchRouter>,
}

/// HTTP server for the binding bridge.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server dispatching through `dispatch`.
    pub fn new(dispatch: DispatchRouter) -> Self {
        let state = AppState {
            router: Arc::new(dispatch),
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(Shutdown::wait(shutdown.subscribe()))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every request is a dispatch; path and method are not significant.
async fn dispatch_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    tracing::trace!(
        request_id = %request_id(request.headers()),
        remote = %remote,
        method = %request.method(),
        path = %request.uri().path(),
        "Dispatch received"
    );
    state.router.dispatch(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindingTable;
    use crate::headers;
    use crate::memory::MemoryObjectStore;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn app() -> Router {
        let table = BindingTable::builder()
            .r2("BUCKET", Arc::new(MemoryObjectStore::new()))
            .build();
        let state = AppState {
            router: Arc::new(DispatchRouter::new(Arc::new(table))),
        };
        HttpServer::build_router(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
    }

    #[tokio::test]
    async fn test_any_path_dispatches_and_gets_request_id() {
        let request = Request::builder()
            .method("PUT")
            .uri("/some/nested/path")
            .header(headers::BINDING_MODULE, "R2")
            .header(headers::BINDING_NAME, "BUCKET")
            .header(headers::R2_DISPATCH, r#"{"operation":"head","parameters":["missing"]}"#)
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"null");
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let request = Request::builder()
            .uri("/")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }
}
