//! Transport codec subsystem.
//!
//! # Data Flow
//! ```text
//! Client proxy:
//!     (operation, [Value])
//!     → Codec::encode (extension registry, ASCII-only JSON)
//!     → X-BRIDGE-<MODULE>-Dispatch header text
//!
//! Bridge handler:
//!     header text
//!     → Codec::decode_header (missing/malformed → empty envelope)
//!     → Envelope { operation, parameters }
//!     → Params::take::<T>() (convert.rs)
//! ```
//!
//! # Design Decisions
//! - Extension types are looked up by wire tag in an explicit registry
//! - A codec with an empty registry speaks plain JSON only
//! - Binary payloads belong in the HTTP body; the header is for metadata
//! - Encoded text is bounded so it always fits an HTTP header

pub mod ascii;
pub mod convert;
pub mod envelope;
pub mod registry;
pub mod value;

use serde_json::Value as Json;
use std::collections::BTreeMap;
use thiserror::Error;

pub use ascii::to_ascii_json;
pub use convert::{FromValue, ObjectBuilder, ObjectFields, ToValue};
pub use envelope::{Envelope, Params};
pub use registry::{Extension, Registry};
pub use value::{HeaderList, Value};

use registry::{OBJECT_ESCAPE_TAG, PAYLOAD_KEY, TAG_KEY};

/// Default upper bound for an encoded dispatch header.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 16 * 1024;

/// Errors raised while encoding or decoding dispatch values.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value's type has no representation in this codec.
    #[error("cannot encode value of type `{0}`")]
    Unsupported(&'static str),

    #[error("unknown type tag `{0}`")]
    UnknownTag(String),

    #[error("invalid `{tag}` payload: {reason}")]
    InvalidPayload { tag: &'static str, reason: String },

    #[error("encoded dispatch header is {size} bytes (max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("parameter {index}: {reason}")]
    InvalidParameter { index: usize, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encoder/decoder for dispatch envelopes.
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Registry,
    max_header_bytes: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self::extended()
    }
}

impl Codec {
    /// Codec with every built-in extension.
    pub fn extended() -> Self {
        Self::with_registry(Registry::standard())
    }

    /// Plain JSON codec. Extension values fail to encode.
    pub fn plain() -> Self {
        Self::with_registry(Registry::empty())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }

    pub fn with_max_header_bytes(mut self, max: usize) -> Self {
        self.max_header_bytes = max;
        self
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    fn is_tagged(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Encode an envelope into header text.
    pub fn encode(&self, operation: &str, parameters: &[Value]) -> Result<String, CodecError> {
        let params = parameters
            .iter()
            .map(|p| self.encode_value(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut root = serde_json::Map::new();
        root.insert("operation".into(), Json::String(operation.to_string()));
        root.insert("parameters".into(), Json::Array(params));

        let text = to_ascii_json(&root)?;
        if text.len() > self.max_header_bytes {
            return Err(CodecError::HeaderTooLarge {
                size: text.len(),
                max: self.max_header_bytes,
            });
        }
        Ok(text)
    }

    /// Decode header text. Empty text yields an empty envelope.
    pub fn decode(&self, text: &str) -> Result<Envelope, CodecError> {
        if text.trim().is_empty() {
            return Ok(Envelope::default());
        }
        let root: Json = serde_json::from_str(text)?;
        let Json::Object(mut root) = root else {
            return Err(CodecError::TypeMismatch {
                expected: "object",
                actual: json_type_name(&root),
            });
        };

        let operation = match root.remove("operation") {
            None | Some(Json::Null) => None,
            Some(Json::String(op)) => Some(op),
            Some(other) => {
                return Err(CodecError::TypeMismatch {
                    expected: "string",
                    actual: json_type_name(&other),
                })
            }
        };
        let parameters = match root.remove("parameters") {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items
                .into_iter()
                .map(|j| self.decode_value(j))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(CodecError::TypeMismatch {
                    expected: "array",
                    actual: json_type_name(&other),
                })
            }
        };

        Ok(Envelope::new(operation, parameters))
    }

    /// Server-side decode: absent or malformed text yields an empty envelope,
    /// so the failure surfaces later as an unsupported operation.
    pub fn decode_header(&self, text: Option<&str>) -> Envelope {
        let Some(text) = text else {
            return Envelope::default();
        };
        match self.decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed dispatch header, treating as empty");
                Envelope::default()
            }
        }
    }

    /// Encode a single value to its JSON wire form.
    pub fn encode_value(&self, value: &Value) -> Result<Json, CodecError> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Number(n) => Ok(Json::Number(n.clone())),
            Value::String(s) => Ok(Json::String(s.clone())),
            Value::Array(items) => Ok(Json::Array(
                items
                    .iter()
                    .map(|v| self.encode_value(v))
                    .collect::<Result<_, _>>()?,
            )),
            Value::Object(map) => self.encode_object(map),
            Value::Undefined | Value::Bytes(_) | Value::Headers(_) | Value::Date(_) => {
                let tag = value.type_name();
                let ext = self.registry.get(tag).ok_or(CodecError::Unsupported(tag))?;
                let mut wrapper = serde_json::Map::new();
                wrapper.insert(TAG_KEY.into(), Json::String(tag.into()));
                wrapper.insert(PAYLOAD_KEY.into(), ext.encode(value)?);
                Ok(Json::Object(wrapper))
            }
        }
    }

    fn encode_object(&self, map: &BTreeMap<String, Value>) -> Result<Json, CodecError> {
        let mut out = serde_json::Map::new();
        for (k, v) in map {
            // Plain JSON has no absent member; drop it like JSON text would.
            if !self.is_tagged() && matches!(v, Value::Undefined) {
                continue;
            }
            out.insert(k.clone(), self.encode_value(v)?);
        }
        if self.is_tagged() && out.contains_key(TAG_KEY) {
            let mut wrapper = serde_json::Map::new();
            wrapper.insert(TAG_KEY.into(), Json::String(OBJECT_ESCAPE_TAG.into()));
            wrapper.insert(PAYLOAD_KEY.into(), Json::Object(out));
            return Ok(Json::Object(wrapper));
        }
        Ok(Json::Object(out))
    }

    /// Decode a single value from its JSON wire form.
    pub fn decode_value(&self, json: Json) -> Result<Value, CodecError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(b)),
            Json::Number(n) => Ok(Value::Number(n)),
            Json::String(s) => Ok(Value::String(s)),
            Json::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|j| self.decode_value(j))
                    .collect::<Result<_, _>>()?,
            )),
            Json::Object(mut map) => {
                if !self.is_tagged() {
                    return self.decode_members(map);
                }
                let tag = match map.get(TAG_KEY) {
                    Some(Json::String(tag)) => tag.clone(),
                    _ => return self.decode_members(map),
                };
                let payload = map.remove(PAYLOAD_KEY).unwrap_or(Json::Null);
                if tag == OBJECT_ESCAPE_TAG {
                    return match payload {
                        Json::Object(inner) => self.decode_members(inner),
                        other => Err(CodecError::TypeMismatch {
                            expected: "object",
                            actual: json_type_name(&other),
                        }),
                    };
                }
                let ext = self
                    .registry
                    .get(&tag)
                    .ok_or_else(|| CodecError::UnknownTag(tag.clone()))?;
                ext.decode(payload)
            }
        }
    }

    fn decode_members(&self, map: serde_json::Map<String, Json>) -> Result<Value, CodecError> {
        let mut out = BTreeMap::new();
        for (k, v) in map {
            out.insert(k, self.decode_value(v)?);
        }
        Ok(Value::Object(out))
    }
}

fn json_type_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
