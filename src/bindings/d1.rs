//! Relational database (D1) binding contract.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::bindings::error::BindingResult;
use crate::codec::{CodecError, FromValue, ObjectBuilder, ObjectFields, ToValue, Value};

/// A query with its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub query: String,
    pub bindings: Vec<Value>,
}

impl Statement {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            bindings: Vec::new(),
        }
    }
}

impl ToValue for Statement {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("query", &self.query)
            .field("bindings", &self.bindings)
            .build()
    }
}

impl FromValue for Statement {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            query: f.require("query")?,
            bindings: f.take::<Option<Vec<Value>>>("bindings")?.unwrap_or_default(),
        })
    }
}

/// Result of `all`, `run` and each `batch` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct D1Result {
    #[serde(default)]
    pub results: Vec<serde_json::Map<String, serde_json::Value>>,
    pub success: bool,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of `exec`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct D1ExecResult {
    pub count: u64,
    /// Milliseconds.
    pub duration: f64,
}

/// Relational database capability.
#[async_trait]
pub trait Database: Send + Sync {
    /// First row, or a single column of the first row when `column` is given.
    async fn first(
        &self,
        statement: Statement,
        column: Option<String>,
    ) -> BindingResult<serde_json::Value>;

    async fn all(&self, statement: Statement) -> BindingResult<D1Result>;

    /// Rows as positional arrays.
    async fn raw(&self, statement: Statement) -> BindingResult<Vec<Vec<serde_json::Value>>>;

    async fn run(&self, statement: Statement) -> BindingResult<D1Result>;

    async fn batch(&self, statements: Vec<Statement>) -> BindingResult<Vec<D1Result>>;

    async fn exec(&self, query: &str) -> BindingResult<D1ExecResult>;

    /// Serialized database image.
    async fn dump(&self) -> BindingResult<Bytes>;
}
