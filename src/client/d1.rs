//! D1 database proxy.
//!
//! `prepare` and `bind` never touch the network; a statement is sent only
//! when one of its execution methods is awaited.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::bindings::d1::{D1ExecResult, D1Result, Statement};
use crate::client::dispatch::{BridgeError, Dispatcher};
use crate::codec::{ToValue, Value};

/// Proxy for a D1 binding hosted by a bridge.
#[derive(Debug, Clone)]
pub struct D1Database {
    dispatcher: Dispatcher,
}

impl D1Database {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn prepare(&self, query: impl Into<String>) -> PreparedStatement {
        PreparedStatement {
            db: self.clone(),
            statement: Statement::new(query),
        }
    }

    /// Run several statements in one transaction.
    pub async fn batch(&self, statements: Vec<PreparedStatement>) -> Result<Vec<D1Result>, BridgeError> {
        let statements: Vec<Statement> = statements.into_iter().map(|s| s.statement).collect();
        self.dispatcher.json("batch", &[statements.to_value()]).await
    }

    /// Execute raw SQL, possibly several `;`-separated statements.
    pub async fn exec(&self, query: &str) -> Result<D1ExecResult, BridgeError> {
        self.dispatcher.json("exec", &[Value::from(query)]).await
    }

    /// Serialized database image.
    pub async fn dump(&self) -> Result<Bytes, BridgeError> {
        let response = self.dispatcher.send("dump", &[], None).await?;
        Ok(response.bytes().await?)
    }
}

/// A query with bound values, ready to execute.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    db: D1Database,
    statement: Statement,
}

impl PreparedStatement {
    /// Replace the positional bind values.
    pub fn bind<I, T>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToValue,
    {
        self.statement.bindings = values.into_iter().map(|v| v.to_value()).collect();
        self
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    fn params(&self) -> [Value; 2] {
        [
            Value::from(self.statement.query.clone()),
            self.statement.bindings.to_value(),
        ]
    }

    /// First row (or one column of it); JSON `null` when there are no rows.
    pub async fn first(&self, column: Option<&str>) -> Result<serde_json::Value, BridgeError> {
        let [query, bindings] = self.params();
        let column = column.map(str::to_string).to_value();
        self.db.dispatcher.json("first", &[query, bindings, column]).await
    }

    /// First row deserialized into `T`.
    pub async fn first_as<T: DeserializeOwned>(&self) -> Result<Option<T>, BridgeError> {
        let row = self.first(None).await?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn all(&self) -> Result<D1Result, BridgeError> {
        self.db.dispatcher.json("all", &self.params()).await
    }

    /// Rows as positional arrays.
    pub async fn raw(&self) -> Result<Vec<Vec<serde_json::Value>>, BridgeError> {
        self.db.dispatcher.json("raw", &self.params()).await
    }

    pub async fn run(&self) -> Result<D1Result, BridgeError> {
        self.db.dispatcher.json("run", &self.params()).await
    }
}
