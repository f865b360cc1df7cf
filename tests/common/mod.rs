//! Shared utilities for integration testing.
//!
//! Each test gets its own bridge on an ephemeral port, backed by memory
//! bindings, a scripted D1 database and an echo upstream for SERVICE.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use axum::routing::any;
use axum::Json;
use serde_json::{json, Map, Value as JsonValue};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use binding_bridge::bindings::d1::{D1ExecResult, D1Result, Statement};
use binding_bridge::bindings::{BindingError, BindingResult, Database, HttpFetcher};
use binding_bridge::client::BridgeClient;
use binding_bridge::codec::Value;
use binding_bridge::memory::{MemoryKv, MemoryObjectStore, MemoryQueue};
use binding_bridge::{BindingTable, HttpServer, Router, Shutdown};

/// A running bridge plus handles on its backing stores.
pub struct TestBridge {
    pub addr: SocketAddr,
    pub client: BridgeClient,
    pub bucket: MemoryObjectStore,
    pub queue: MemoryQueue,
    pub upstream: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestBridge {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

impl Drop for TestBridge {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a bridge hosting `BUCKET` (R2), `CACHE` (KV), `DB` (D1),
/// `JOBS` (QUEUE) and `API` (SERVICE).
pub async fn start_bridge() -> TestBridge {
    let shutdown = Shutdown::new();
    let upstream = start_echo_upstream(shutdown.clone()).await;

    let bucket = MemoryObjectStore::new();
    let queue = MemoryQueue::new();
    let fetcher = HttpFetcher::new(&format!("http://{upstream}")).unwrap();

    let table = BindingTable::builder()
        .r2("BUCKET", Arc::new(bucket.clone()))
        .kv("CACHE", Arc::new(MemoryKv::new()))
        .d1("DB", Arc::new(ScriptedDatabase::new()))
        .queue("JOBS", Arc::new(queue.clone()))
        .service("API", Arc::new(fetcher))
        .build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(Router::new(Arc::new(table)));
    tokio::spawn(server.run(listener, shutdown.clone()));

    let client = BridgeClient::new(&format!("http://{addr}/")).unwrap();
    TestBridge {
        addr,
        client,
        bucket,
        queue,
        upstream,
        shutdown,
    }
}

/// Run the same call against two targets concurrently.
pub async fn run_both<T, F, Fut>(a: T, b: T, f: F) -> (Fut::Output, Fut::Output)
where
    F: Fn(T) -> Fut,
    Fut: Future,
{
    tokio::join!(f(a), f(b))
}

/// Upstream that echoes each request back as JSON.
async fn start_echo_upstream(shutdown: Shutdown) -> SocketAddr {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<JsonValue> {
        let bridge_headers: Vec<&str> = headers
            .keys()
            .map(|k| k.as_str())
            .filter(|k| k.starts_with("x-bridge-"))
            .collect();
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "host": headers.get("host").and_then(|v| v.to_str().ok()),
            "tag": headers.get("x-test-tag").and_then(|v| v.to_str().ok()),
            "bridgeHeaders": bridge_headers,
            "body": String::from_utf8_lossy(&body),
        }))
    }

    let app = axum::Router::new()
        .route("/", any(echo))
        .route("/{*path}", any(echo));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(Shutdown::wait(shutdown.subscribe()))
            .await
    });
    addr
}

/// In-memory stand-in for a host database with one `users` table.
///
/// Understands `SELECT * FROM users`, `INSERT INTO users (name) VALUES (?)`
/// and nothing else.
pub struct ScriptedDatabase {
    users: Mutex<Vec<Map<String, JsonValue>>>,
}

impl ScriptedDatabase {
    pub fn new() -> Self {
        let seed = [(1, "ada"), (2, "grace")]
            .into_iter()
            .map(|(id, name)| {
                let mut row = Map::new();
                row.insert("id".into(), json!(id));
                row.insert("name".into(), json!(name));
                row
            })
            .collect();
        Self {
            users: Mutex::new(seed),
        }
    }

    async fn execute(&self, statement: &Statement) -> BindingResult<D1Result> {
        let query = statement.query.trim();
        let mut users = self.users.lock().await;
        if query.eq_ignore_ascii_case("SELECT * FROM users") {
            return Ok(D1Result {
                results: users.clone(),
                success: true,
                meta: meta(0, users.len()),
                error: None,
            });
        }
        if query.eq_ignore_ascii_case("INSERT INTO users (name) VALUES (?)") {
            let name = match statement.bindings.first() {
                Some(Value::String(name)) => name.clone(),
                _ => return Err(BindingError::constraint("NOT NULL constraint failed: users.name")),
            };
            let mut row = Map::new();
            row.insert("id".into(), json!(users.len() + 1));
            row.insert("name".into(), json!(name));
            users.push(row);
            return Ok(D1Result {
                results: Vec::new(),
                success: true,
                meta: meta(1, 0),
                error: None,
            });
        }
        Err(BindingError::query(format!("D1_ERROR: no such statement: {query}")))
    }
}

fn meta(changes: usize, rows_read: usize) -> Map<String, JsonValue> {
    let mut meta = Map::new();
    meta.insert("changes".into(), json!(changes));
    meta.insert("rows_read".into(), json!(rows_read));
    meta
}

#[async_trait]
impl Database for ScriptedDatabase {
    async fn first(&self, statement: Statement, column: Option<String>) -> BindingResult<JsonValue> {
        let result = self.execute(&statement).await?;
        let Some(row) = result.results.into_iter().next() else {
            return Ok(JsonValue::Null);
        };
        match column {
            None => Ok(JsonValue::Object(row)),
            Some(column) => row
                .get(&column)
                .cloned()
                .ok_or_else(|| BindingError::query(format!("D1_COLUMN_NOTFOUND: Column not found ({column})"))),
        }
    }

    async fn all(&self, statement: Statement) -> BindingResult<D1Result> {
        self.execute(&statement).await
    }

    async fn raw(&self, statement: Statement) -> BindingResult<Vec<Vec<JsonValue>>> {
        let result = self.execute(&statement).await?;
        Ok(result
            .results
            .into_iter()
            .map(|row| row.into_iter().map(|(_, v)| v).collect())
            .collect())
    }

    async fn run(&self, statement: Statement) -> BindingResult<D1Result> {
        self.execute(&statement).await
    }

    async fn batch(&self, statements: Vec<Statement>) -> BindingResult<Vec<D1Result>> {
        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            results.push(self.execute(statement).await?);
        }
        Ok(results)
    }

    async fn exec(&self, query: &str) -> BindingResult<D1ExecResult> {
        let count = query.split(';').filter(|s| !s.trim().is_empty()).count();
        Ok(D1ExecResult {
            count: count as u64,
            duration: 0.0,
        })
    }

    async fn dump(&self) -> BindingResult<axum::body::Bytes> {
        Ok(Bytes::from_static(b"SQLite format 3\0"))
    }
}
