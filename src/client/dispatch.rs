//! Shared HTTP dispatch for the client proxies.

use axum::http::HeaderName;
use serde::de::DeserializeOwned;
use url::Url;

use crate::bindings::{ErrorKind, Module};
use crate::codec::{Codec, CodecError, Value};
use crate::headers;

/// Client-side failure of a bridged call.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The bridge answered with a non-2xx status.
    #[error("bridge returned {status}: {message}")]
    Remote {
        status: u16,
        kind: Option<ErrorKind>,
        message: String,
    },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BridgeError {
    /// Typed binding error kind, when the bridge reported one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            BridgeError::Remote { kind, .. } => *kind,
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BridgeError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::InvalidResponse(e.to_string())
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url, BridgeError> {
    Url::parse(url).map_err(|e| BridgeError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Addresses one binding on one bridge.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    url: Url,
    module: Module,
    binding: String,
    codec: Codec,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client, url: Url, module: Module, binding: impl Into<String>) -> Self {
        let codec = match module {
            Module::Service => Codec::plain(),
            _ => Codec::extended(),
        };
        Self {
            http,
            url,
            module,
            binding: binding.into(),
            codec,
        }
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn module(&self) -> Module {
        self.module
    }

    pub fn binding(&self) -> &str {
        &self.binding
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn dispatch_header(&self) -> HeaderName {
        headers::dispatch_header(self.module)
    }

    /// Encode the envelope header for `operation`.
    pub fn encode(&self, operation: &str, params: &[Value]) -> Result<String, BridgeError> {
        Ok(self.codec.encode(operation, params)?)
    }

    /// POST one dispatch; non-2xx statuses become [`BridgeError::Remote`].
    pub async fn send(
        &self,
        operation: &str,
        params: &[Value],
        body: Option<reqwest::Body>,
    ) -> Result<reqwest::Response, BridgeError> {
        let envelope = self.encode(operation, params)?;
        let mut request = self
            .http
            .post(self.url.clone())
            .header(headers::BINDING_MODULE, self.module.as_str())
            .header(headers::BINDING_NAME, self.binding.as_str())
            .header(self.dispatch_header(), envelope);
        if let Some(body) = body {
            request = request.body(body);
        }

        tracing::debug!(
            module = %self.module,
            binding = %self.binding,
            operation = %operation,
            "Sending dispatch"
        );

        let response = request.send().await?;
        check_status(response).await
    }

    /// Dispatch and parse the JSON response body.
    pub async fn json<T: DeserializeOwned>(
        &self,
        operation: &str,
        params: &[Value],
    ) -> Result<T, BridgeError> {
        let response = self.send(operation, params, None).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Dispatch an operation whose response carries no data.
    pub async fn unit(
        &self,
        operation: &str,
        params: &[Value],
        body: Option<reqwest::Body>,
    ) -> Result<(), BridgeError> {
        self.send(operation, params, body).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into a typed error.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BridgeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let kind = response
        .headers()
        .get(headers::ERROR_KIND)
        .and_then(|v| v.to_str().ok())
        .map(ErrorKind::parse);
    let message = response.text().await.unwrap_or_default();
    Err(BridgeError::Remote {
        status: status.as_u16(),
        kind,
        message,
    })
}

/// Parse a JSON metadata header.
pub(crate) fn header_json<T: DeserializeOwned>(
    response: &reqwest::Response,
    name: &HeaderName,
) -> Result<Option<T>, BridgeError> {
    match response.headers().get(name) {
        None => Ok(None),
        Some(value) => {
            let text = value
                .to_str()
                .map_err(|e| BridgeError::InvalidResponse(format!("{name}: {e}")))?;
            Ok(Some(serde_json::from_str(text)?))
        }
    }
}
