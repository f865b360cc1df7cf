//! Service-to-service fetch binding contract.
//!
//! # Responsibilities
//! - Define the `Fetcher` capability (one HTTP exchange with a bound service)
//! - Provide `HttpFetcher`, forwarding to an upstream origin over HTTP
//!
//! # Design Decisions
//! - The incoming request's path and query are preserved; only the authority
//!   is rewritten, the same way a reverse proxy forwards
//! - Bodies stream in both directions

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::str::FromStr;

use crate::bindings::error::{BindingError, BindingResult};

/// Inter-service fetch capability.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: Request<Body>) -> BindingResult<Response<Body>>;
}

/// Forwards requests to a fixed upstream origin.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
}

impl HttpFetcher {
    /// `origin` is an `http://host:port` URL; any path is ignored.
    pub fn new(origin: &str) -> BindingResult<Self> {
        let uri = Uri::from_str(origin)
            .map_err(|e| BindingError::invalid_argument(format!("invalid upstream '{origin}': {e}")))?;
        let scheme = uri.scheme().cloned().unwrap_or(Scheme::HTTP);
        if scheme != Scheme::HTTP {
            return Err(BindingError::invalid_argument(format!(
                "unsupported upstream scheme '{scheme}', only http is supported"
            )));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| BindingError::invalid_argument(format!("upstream '{origin}' has no host")))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            client,
            scheme,
            authority,
        })
    }

    fn rewrite(&self, uri: &Uri) -> BindingResult<Uri> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some("/".parse().map_err(|_| BindingError::internal("invalid path"))?);
        }
        Uri::from_parts(parts).map_err(|e| BindingError::invalid_argument(e.to_string()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: Request<Body>) -> BindingResult<Response<Body>> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.rewrite(&parts.uri)?;
        if let Ok(host) = self.authority.as_str().parse() {
            parts.headers.insert(axum::http::header::HOST, host);
        }

        tracing::debug!(uri = %parts.uri, method = %parts.method, "Forwarding service fetch");

        let response: Response<hyper::body::Incoming> = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| BindingError::upstream(format!("service fetch failed: {e}")))?;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_keeps_path_and_query() {
        let fetcher = HttpFetcher::new("http://127.0.0.1:9000").unwrap();
        let uri: Uri = "https://my-service.example/api/items?page=2".parse().unwrap();
        let rewritten = fetcher.rewrite(&uri).unwrap();
        assert_eq!(rewritten.to_string(), "http://127.0.0.1:9000/api/items?page=2");
    }

    #[test]
    fn test_rejects_bad_upstreams() {
        assert!(HttpFetcher::new("https://secure.example").is_err());
        assert!(HttpFetcher::new("/just/a/path").is_err());
    }
}
