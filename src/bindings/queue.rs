//! Queue producer binding contract.

use async_trait::async_trait;

use crate::bindings::error::{BindingError, BindingResult};
use crate::codec::{CodecError, FromValue, ObjectBuilder, ObjectFields, ToValue, Value};

/// How a message body is serialized by the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentType {
    #[default]
    Json,
    Text,
    Bytes,
    V8,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Text => "text",
            ContentType::Bytes => "bytes",
            ContentType::V8 => "v8",
        }
    }
}

impl ToValue for ContentType {
    fn to_value(&self) -> Value {
        Value::from(self.as_str())
    }
}

impl FromValue for ContentType {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value.as_str() {
            Some("json") => Ok(ContentType::Json),
            Some("text") => Ok(ContentType::Text),
            Some("bytes") => Ok(ContentType::Bytes),
            Some("v8") => Ok(ContentType::V8),
            Some(other) => Err(CodecError::InvalidPayload {
                tag: "contentType",
                reason: format!("unknown content type `{other}`"),
            }),
            None => Err(CodecError::TypeMismatch {
                expected: "string",
                actual: value.type_name(),
            }),
        }
    }
}

/// A message to enqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub body: Value,
    pub content_type: Option<ContentType>,
    pub delay_seconds: Option<u32>,
}

impl QueueMessage {
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            delay_seconds: None,
        }
    }

    /// Check the body against its declared content type.
    pub fn validate(&self) -> Result<(), BindingError> {
        let ok = match self.content_type.unwrap_or_default() {
            ContentType::Text => matches!(self.body, Value::String(_)),
            ContentType::Bytes => matches!(self.body, Value::Bytes(_)),
            ContentType::Json => self.body.clone().into_json().is_ok(),
            ContentType::V8 => true,
        };
        if ok {
            Ok(())
        } else {
            Err(BindingError::invalid_argument(format!(
                "message body of type {} cannot be sent as {}",
                self.body.type_name(),
                self.content_type.unwrap_or_default().as_str()
            )))
        }
    }
}

impl ToValue for QueueMessage {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("body", &self.body)
            .field("contentType", self.content_type)
            .field("delaySeconds", self.delay_seconds)
            .build()
    }
}

impl FromValue for QueueMessage {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            body: f.take("body")?,
            content_type: f.take("contentType")?,
            delay_seconds: f.take("delaySeconds")?,
        })
    }
}

/// Options for `send`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    pub content_type: Option<ContentType>,
    pub delay_seconds: Option<u32>,
}

impl ToValue for SendOptions {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("contentType", self.content_type)
            .field("delaySeconds", self.delay_seconds)
            .build()
    }
}

impl FromValue for SendOptions {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            content_type: f.take("contentType")?,
            delay_seconds: f.take("delaySeconds")?,
        })
    }
}

/// Options for `sendBatch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOptions {
    pub delay_seconds: Option<u32>,
}

impl ToValue for BatchOptions {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("delaySeconds", self.delay_seconds)
            .build()
    }
}

impl FromValue for BatchOptions {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            delay_seconds: f.take("delaySeconds")?,
        })
    }
}

/// Queue producer capability.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Enqueue one message; `message` already carries the send options.
    async fn send(&self, message: QueueMessage) -> BindingResult<()>;

    async fn send_batch(&self, messages: Vec<QueueMessage>) -> BindingResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_validate_content_types() {
        let mut msg = QueueMessage::new("hello");
        msg.content_type = Some(ContentType::Text);
        assert!(msg.validate().is_ok());

        msg.content_type = Some(ContentType::Bytes);
        let err = msg.validate().unwrap_err();
        assert!(err.message().contains("bytes"));

        let mut bin = QueueMessage::new(Bytes::from_static(b"\x01"));
        bin.content_type = Some(ContentType::Bytes);
        assert!(bin.validate().is_ok());

        // JSON is the default and cannot carry binary.
        bin.content_type = None;
        assert!(bin.validate().is_err());
    }
}
