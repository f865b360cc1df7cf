//! Binding error types and stable error kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::codec::CodecError;

/// Stable error kinds carried across the bridge.
///
/// Sent in the `X-BRIDGE-Error-Kind` response header so clients recover a
/// typed error instead of a bare message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidArgument,
    PreconditionFailed,
    ChecksumMismatch,
    Query,
    Constraint,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorKind::ChecksumMismatch => "CHECKSUM_MISMATCH",
            ErrorKind::Query => "QUERY",
            ErrorKind::Constraint => "CONSTRAINT",
            ErrorKind::Upstream => "UPSTREAM",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Parse a header value; unknown kinds map to `Internal`.
    pub fn parse(s: &str) -> Self {
        match s {
            "INVALID_ARGUMENT" => ErrorKind::InvalidArgument,
            "PRECONDITION_FAILED" => ErrorKind::PreconditionFailed,
            "CHECKSUM_MISMATCH" => ErrorKind::ChecksumMismatch,
            "QUERY" => ErrorKind::Query,
            "CONSTRAINT" => ErrorKind::Constraint,
            "UPSTREAM" => ErrorKind::Upstream,
            _ => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a binding implementation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BindingError {
    kind: ErrorKind,
    message: String,
}

impl BindingError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Constraint, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CodecError> for BindingError {
    fn from(e: CodecError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl From<std::io::Error> for BindingError {
    fn from(e: std::io::Error) -> Self {
        Self::internal(e.to_string())
    }
}

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            ErrorKind::InvalidArgument,
            ErrorKind::PreconditionFailed,
            ErrorKind::ChecksumMismatch,
            ErrorKind::Query,
            ErrorKind::Constraint,
            ErrorKind::Upstream,
            ErrorKind::Internal,
        ] {
            assert_eq!(ErrorKind::parse(kind.as_str()), kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.as_str().into())
            );
        }
        assert_eq!(ErrorKind::parse("SOMETHING_NEW"), ErrorKind::Internal);
    }

    #[test]
    fn test_error_display_is_message() {
        let err = BindingError::constraint("UNIQUE constraint failed: todos.TodoId");
        assert_eq!(err.to_string(), "UNIQUE constraint failed: todos.TodoId");
        assert_eq!(err.kind(), ErrorKind::Constraint);
    }

    #[test]
    fn test_codec_errors_are_invalid_arguments() {
        let err: BindingError = CodecError::MissingField("key".into()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
