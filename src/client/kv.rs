//! KV namespace proxy.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::bindings::kv::{KvEntry, KvGetOptions, KvListOptions, KvListResult, KvPutOptions};
use crate::client::dispatch::{header_json, BridgeError, Dispatcher};
use crate::codec::{ToValue, Value};
use crate::headers;

/// Proxy for a KV binding hosted by a bridge.
#[derive(Debug, Clone)]
pub struct KvClient {
    dispatcher: Dispatcher,
}

impl KvClient {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Value and metadata, or `None` when the key is absent.
    pub async fn get_with_metadata(
        &self,
        key: &str,
        options: KvGetOptions,
    ) -> Result<Option<KvEntry>, BridgeError> {
        let params = [Value::from(key), options.to_value()];
        let response = self.dispatcher.send("get", &params, None).await?;

        // The metadata header is present exactly when the key exists.
        let Some(metadata) = header_json::<Option<serde_json::Value>>(&response, &headers::KV_METADATA)? else {
            return Ok(None);
        };
        let value = response.bytes().await?;
        Ok(Some(KvEntry { value, metadata }))
    }

    pub async fn get(&self, key: &str, options: KvGetOptions) -> Result<Option<Bytes>, BridgeError> {
        Ok(self.get_with_metadata(key, options).await?.map(|e| e.value))
    }

    pub async fn get_text(&self, key: &str, options: KvGetOptions) -> Result<Option<String>, BridgeError> {
        match self.get(key, options).await? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| BridgeError::InvalidResponse(format!("value is not UTF-8: {e}"))),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        key: &str,
        options: KvGetOptions,
    ) -> Result<Option<T>, BridgeError> {
        match self.get(key, options).await? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    pub async fn put(
        &self,
        key: &str,
        value: impl Into<Bytes>,
        options: KvPutOptions,
    ) -> Result<(), BridgeError> {
        let params = [Value::from(key), Value::Null, options.to_value()];
        let body = reqwest::Body::from(value.into());
        self.dispatcher.unit("put", &params, Some(body)).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), BridgeError> {
        self.dispatcher.unit("delete", &[Value::from(key)], None).await
    }

    pub async fn list(&self, options: KvListOptions) -> Result<KvListResult, BridgeError> {
        self.dispatcher.json("list", &[options.to_value()]).await
    }
}
