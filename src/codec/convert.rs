//! Conversions between typed Rust values and [`Value`].

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::codec::value::{HeaderList, Value};
use crate::codec::CodecError;

/// Types that can be sent as a dispatch parameter.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Types that can be read back from a dispatch parameter.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, CodecError>;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> Result<T, CodecError> {
    Err(CodecError::TypeMismatch {
        expected,
        actual: value.type_name(),
    })
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        Ok(value)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::String(s) => Ok(s),
            other => mismatch("string", &other),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => mismatch("boolean", &other),
        }
    }
}

macro_rules! integer_value {
    ($($ty:ty => $as:ident),* $(,)?) => {$(
        impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::Number((*self).into())
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, CodecError> {
                match &value {
                    Value::Number(n) => n
                        .$as()
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or(CodecError::TypeMismatch {
                            expected: stringify!($ty),
                            actual: "number",
                        }),
                    other => mismatch(stringify!($ty), other),
                }
            }
        }
    )*};
}

integer_value!(u32 => as_u64, u64 => as_u64, i64 => as_i64);

impl ToValue for f64 {
    /// Non-finite numbers become `null`, as in JSON text.
    fn to_value(&self) -> Value {
        Value::from_f64(*self).unwrap_or(Value::Null)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match &value {
            Value::Number(n) => n.as_f64().ok_or(CodecError::TypeMismatch {
                expected: "f64",
                actual: "number",
            }),
            other => mismatch("number", other),
        }
    }
}

impl ToValue for Bytes {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => mismatch("ArrayBuffer", &other),
        }
    }
}

impl ToValue for HeaderList {
    fn to_value(&self) -> Value {
        Value::Headers(self.clone())
    }
}

impl FromValue for HeaderList {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Headers(h) => Ok(h),
            other => mismatch("Headers", &other),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl FromValue for DateTime<Utc> {
    /// Accepts a `Date`, or RFC 3339 text as produced by JSON serialization.
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Date(d) => Ok(d),
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| CodecError::InvalidPayload {
                    tag: "Date",
                    reason: e.to_string(),
                }),
            other => mismatch("Date", &other),
        }
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::from_json(self.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        value.into_json()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    /// `None` is an absent argument.
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Undefined,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    /// Both `undefined` and `null` read as `None`.
    fn from_value(value: Value) -> Result<Self, CodecError> {
        if value.is_nullish() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => mismatch("array", &other),
        }
    }
}

impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => mismatch("object", &other),
        }
    }
}

/// Builds an object value field by field, skipping absent ones.
#[derive(Debug, Default)]
pub struct ObjectBuilder(BTreeMap<String, Value>);

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: impl ToValue) -> Self {
        let value = value.to_value();
        if !matches!(value, Value::Undefined) {
            self.0.insert(name.to_string(), value);
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.0)
    }
}

/// Reads an object value field by field.
#[derive(Debug, Default)]
pub struct ObjectFields(BTreeMap<String, Value>);

impl ObjectFields {
    /// Accepts an object; `undefined`/`null` read as an empty object.
    pub fn new(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Undefined | Value::Null => Ok(Self::default()),
            other => mismatch("object", &other),
        }
    }

    /// Take `name`, reading a missing member as `undefined`.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, CodecError> {
        let raw = self.0.remove(name).unwrap_or(Value::Undefined);
        T::from_value(raw).map_err(|e| CodecError::InvalidPayload {
            tag: "field",
            reason: format!("`{name}`: {e}"),
        })
    }

    /// Take a member that must be present.
    pub fn require<T: FromValue>(&mut self, name: &str) -> Result<T, CodecError> {
        match self.0.get(name) {
            None | Some(Value::Undefined) => Err(CodecError::MissingField(name.to_string())),
            Some(_) => self.take(name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}
