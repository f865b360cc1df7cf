//! Dispatch envelope: the operation name and its ordered arguments.

use crate::codec::convert::FromValue;
use crate::codec::value::Value;
use crate::codec::CodecError;

/// `{operation, parameters}` as carried by a dispatch header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    operation: Option<String>,
    parameters: Vec<Value>,
}

impl Envelope {
    pub fn new(operation: Option<String>, parameters: Vec<Value>) -> Self {
        Self {
            operation,
            parameters,
        }
    }

    /// Operation name, `None` for an empty envelope.
    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Split into the operation name and a positional parameter reader.
    pub fn into_parts(self) -> (Option<String>, Params) {
        (self.operation, Params(self.parameters))
    }
}

/// Positional parameters, consumed by index.
#[derive(Debug, Default)]
pub struct Params(Vec<Value>);

impl Params {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take and convert parameter `index`. Missing positions read as `undefined`.
    pub fn take<T: FromValue>(&mut self, index: usize) -> Result<T, CodecError> {
        let raw = self
            .0
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, Value::Undefined))
            .unwrap_or(Value::Undefined);
        T::from_value(raw).map_err(|e| CodecError::InvalidParameter {
            index,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_converts_and_defaults_missing() {
        let envelope = Envelope::new(
            Some("get".into()),
            vec![Value::from("key"), Value::Undefined],
        );
        let (op, mut params) = envelope.into_parts();
        assert_eq!(op.as_deref(), Some("get"));
        assert_eq!(params.len(), 2);

        let key: String = params.take(0).unwrap();
        assert_eq!(key, "key");
        let opt: Option<String> = params.take(1).unwrap();
        assert!(opt.is_none());
        let missing: Option<u32> = params.take(7).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_take_reports_position_on_mismatch() {
        let (_, mut params) = Envelope::new(Some("head".into()), vec![Value::from(3i64)]).into_parts();
        let err = params.take::<String>(0).unwrap_err();
        assert!(err.to_string().contains("parameter 0"));
    }
}
