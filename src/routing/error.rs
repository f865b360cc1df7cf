//! Dispatch failures and their HTTP mapping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::bindings::{BindingError, Module};
use crate::codec::CodecError;
use crate::headers;

/// Why a dispatch did not produce a binding result.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("missing {0} header")]
    MissingSelector(&'static str),

    #[error("binding '{0}' does not exist")]
    UnknownBinding(String),

    #[error("module '{0}' is not supported")]
    UnknownModule(String),

    #[error("binding '{name}' is a {actual} binding, not {claimed}")]
    ModuleMismatch {
        name: String,
        claimed: Module,
        actual: Module,
    },

    #[error("{module}.{operation}() is not supported.")]
    UnsupportedOperation { module: Module, operation: String },

    #[error("{0} dispatch carried no operation.")]
    MissingOperation(Module),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl DispatchError {
    pub fn unsupported(module: Module, operation: Option<String>) -> Self {
        match operation {
            Some(operation) => DispatchError::UnsupportedOperation { module, operation },
            None => DispatchError::MissingOperation(module),
        }
    }

    /// True when no handler recognized the requested operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            DispatchError::UnsupportedOperation { .. } | DispatchError::MissingOperation(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::MissingSelector(_) | DispatchError::UnknownBinding(_) => {
                StatusCode::BAD_REQUEST
            }
            DispatchError::UnknownModule(_)
            | DispatchError::ModuleMismatch { .. }
            | DispatchError::UnsupportedOperation { .. }
            | DispatchError::MissingOperation(_) => StatusCode::NOT_FOUND,
            DispatchError::Binding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CodecError> for DispatchError {
    fn from(e: CodecError) -> Self {
        DispatchError::Binding(e.into())
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, self.to_string()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if let DispatchError::Binding(e) = &self {
            response
                .headers_mut()
                .insert(headers::ERROR_KIND, HeaderValue::from_static(e.kind().as_str()));
        }
        response
    }
}
