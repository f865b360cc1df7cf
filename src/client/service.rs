//! Service-to-service fetch proxy.
//!
//! Two modes, fixed at construction:
//! - **Bridged**: the request goes to the bridge with its method, headers and
//!   body intact; the original URL travels in the dispatch envelope.
//! - **Direct**: only scheme, host and port are swapped for the service's
//!   origin and the request goes straight to the service.

use axum::http::HeaderValue;
use url::Url;

use crate::bindings::Module;
use crate::client::dispatch::{parse_url, BridgeError, Dispatcher};
use crate::codec::Value;
use crate::headers;

#[derive(Debug, Clone)]
enum Mode {
    Bridged(Dispatcher),
    Direct { http: reqwest::Client, origin: Url },
}

/// Fetcher for a SERVICE binding.
#[derive(Debug, Clone)]
pub struct ServiceFetcher {
    mode: Mode,
}

impl ServiceFetcher {
    /// Route requests through the bridge binding described by `dispatcher`.
    pub fn bridged(dispatcher: Dispatcher) -> Result<Self, BridgeError> {
        if dispatcher.module() != Module::Service {
            return Err(BridgeError::InvalidUrl {
                url: dispatcher.url().to_string(),
                reason: format!("dispatcher targets a {} binding", dispatcher.module()),
            });
        }
        Ok(Self::through_bridge(dispatcher))
    }

    pub(crate) fn through_bridge(dispatcher: Dispatcher) -> Self {
        Self {
            mode: Mode::Bridged(dispatcher),
        }
    }

    /// Send requests straight to the service at `origin`.
    pub fn direct(http: reqwest::Client, origin: &str) -> Result<Self, BridgeError> {
        let origin = parse_url(origin)?;
        if origin.host_str().is_none() {
            return Err(BridgeError::InvalidUrl {
                url: origin.to_string(),
                reason: "missing host".into(),
            });
        }
        Ok(Self {
            mode: Mode::Direct { http, origin },
        })
    }

    /// Rewrite `request` for the configured mode without sending it.
    pub fn prepare(&self, mut request: reqwest::Request) -> Result<reqwest::Request, BridgeError> {
        match &self.mode {
            Mode::Bridged(dispatcher) => {
                let original = request.url().to_string();
                let envelope = dispatcher.encode("fetch", &[Value::from(original)])?;
                *request.url_mut() = dispatcher.url().clone();

                let map = request.headers_mut();
                map.insert(
                    headers::BINDING_MODULE,
                    HeaderValue::from_static(Module::Service.as_str()),
                );
                map.insert(headers::BINDING_NAME, header_value(dispatcher.binding())?);
                map.insert(headers::SERVICE_DISPATCH, header_value(&envelope)?);
                Ok(request)
            }
            Mode::Direct { origin, .. } => {
                let url = request.url_mut();
                let invalid = |reason: &str| BridgeError::InvalidUrl {
                    url: origin.to_string(),
                    reason: reason.to_string(),
                };
                url.set_scheme(origin.scheme())
                    .map_err(|_| invalid("cannot switch scheme"))?;
                url.set_host(origin.host_str())
                    .map_err(|e| invalid(&e.to_string()))?;
                url.set_port(origin.port())
                    .map_err(|_| invalid("cannot set port"))?;
                Ok(request)
            }
        }
    }

    /// Perform one exchange. The service's response is returned as-is,
    /// whatever its status.
    pub async fn fetch(&self, request: reqwest::Request) -> Result<reqwest::Response, BridgeError> {
        let request = self.prepare(request)?;
        let http = match &self.mode {
            Mode::Bridged(dispatcher) => dispatcher.http(),
            Mode::Direct { http, .. } => http,
        };
        Ok(http.execute(request).await?)
    }
}

fn header_value(text: &str) -> Result<HeaderValue, BridgeError> {
    HeaderValue::from_str(text).map_err(|e| BridgeError::InvalidResponse(format!("header value: {e}")))
}
