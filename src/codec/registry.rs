//! Extension codecs keyed by wire-level type tag.
//!
//! An extension value travels as `{"$t": <tag>, "v": <payload>}`. The tag is
//! the only thing consulted when decoding; nothing inspects runtime types.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::value::{HeaderList, Value};
use crate::codec::CodecError;

/// Key holding the type tag of an extension value.
pub const TAG_KEY: &str = "$t";
/// Key holding the payload of an extension value.
pub const PAYLOAD_KEY: &str = "v";
/// Tag wrapping plain objects that themselves contain [`TAG_KEY`].
pub const OBJECT_ESCAPE_TAG: &str = "object";

/// Encode/decode pair for one extension type.
pub trait Extension: Send + Sync {
    /// Wire discriminant. Equal to [`Value::type_name`] of the variant handled.
    fn tag(&self) -> &'static str;

    /// Produce the JSON payload for `value`.
    fn encode(&self, value: &Value) -> Result<Json, CodecError>;

    /// Rebuild the value from its payload.
    fn decode(&self, payload: Json) -> Result<Value, CodecError>;
}

/// Set of extensions a codec understands.
#[derive(Clone, Default)]
pub struct Registry {
    extensions: HashMap<&'static str, Arc<dyn Extension>>,
}

impl Registry {
    /// Registry with no extensions (plain JSON).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with all built-in extensions.
    pub fn standard() -> Self {
        Self::empty()
            .with(UndefinedExt)
            .with(ArrayBufferExt)
            .with(HeadersExt)
            .with(DateExt)
    }

    /// Add (or replace) an extension.
    pub fn with(mut self, ext: impl Extension + 'static) -> Self {
        self.extensions.insert(ext.tag(), Arc::new(ext));
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions.get(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.extensions.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("tags", &self.tags()).finish()
    }
}

fn mismatch(tag: &'static str, value: &Value) -> CodecError {
    CodecError::InvalidPayload {
        tag,
        reason: format!("cannot encode {}", value.type_name()),
    }
}

/// Absent argument.
pub struct UndefinedExt;

impl Extension for UndefinedExt {
    fn tag(&self) -> &'static str {
        "undefined"
    }

    fn encode(&self, _value: &Value) -> Result<Json, CodecError> {
        Ok(Json::Null)
    }

    fn decode(&self, _payload: Json) -> Result<Value, CodecError> {
        Ok(Value::Undefined)
    }
}

/// Binary buffer as lowercase hex, two characters per byte.
pub struct ArrayBufferExt;

impl Extension for ArrayBufferExt {
    fn tag(&self) -> &'static str {
        "ArrayBuffer"
    }

    fn encode(&self, value: &Value) -> Result<Json, CodecError> {
        match value {
            Value::Bytes(b) => Ok(Json::String(hex::encode(b))),
            other => Err(mismatch(self.tag(), other)),
        }
    }

    fn decode(&self, payload: Json) -> Result<Value, CodecError> {
        let text = payload.as_str().ok_or_else(|| CodecError::InvalidPayload {
            tag: "ArrayBuffer",
            reason: "expected hex string".into(),
        })?;
        let raw = hex::decode(text).map_err(|e| CodecError::InvalidPayload {
            tag: "ArrayBuffer",
            reason: e.to_string(),
        })?;
        Ok(Value::Bytes(Bytes::from(raw)))
    }
}

/// Header collection as `[[name, value], ...]`.
pub struct HeadersExt;

impl Extension for HeadersExt {
    fn tag(&self) -> &'static str {
        "Headers"
    }

    fn encode(&self, value: &Value) -> Result<Json, CodecError> {
        match value {
            Value::Headers(h) => Ok(Json::Array(
                h.iter()
                    .map(|(n, v)| Json::Array(vec![n.into(), v.into()]))
                    .collect(),
            )),
            other => Err(mismatch(self.tag(), other)),
        }
    }

    fn decode(&self, payload: Json) -> Result<Value, CodecError> {
        let invalid = || CodecError::InvalidPayload {
            tag: "Headers",
            reason: "expected array of [name, value] pairs".into(),
        };
        let Json::Array(pairs) = payload else {
            return Err(invalid());
        };
        let mut headers = HeaderList::new();
        for pair in pairs {
            match pair {
                Json::Array(p) if p.len() == 2 => match (&p[0], &p[1]) {
                    (Json::String(n), Json::String(v)) => headers.append(n.clone(), v.clone()),
                    _ => return Err(invalid()),
                },
                _ => return Err(invalid()),
            }
        }
        Ok(Value::Headers(headers))
    }
}

/// Date as RFC 3339 text.
pub struct DateExt;

impl Extension for DateExt {
    fn tag(&self) -> &'static str {
        "Date"
    }

    fn encode(&self, value: &Value) -> Result<Json, CodecError> {
        match value {
            Value::Date(d) => Ok(Json::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
            other => Err(mismatch(self.tag(), other)),
        }
    }

    fn decode(&self, payload: Json) -> Result<Value, CodecError> {
        let text = payload.as_str().ok_or_else(|| CodecError::InvalidPayload {
            tag: "Date",
            reason: "expected RFC 3339 string".into(),
        })?;
        let parsed = DateTime::parse_from_rfc3339(text).map_err(|e| CodecError::InvalidPayload {
            tag: "Date",
            reason: e.to_string(),
        })?;
        Ok(Value::Date(parsed.with_timezone(&Utc)))
    }
}
