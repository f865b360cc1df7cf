//! Key-value namespace (KV) binding contract.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::bindings::error::BindingResult;
use crate::codec::{CodecError, FromValue, ObjectBuilder, ObjectFields, ToValue, Value};

/// Minimum accepted `expirationTtl`, in seconds.
pub const MIN_EXPIRATION_TTL: u64 = 60;
/// Default and maximum page size for `list`.
pub const MAX_KV_LIST_LIMIT: u32 = 1000;

/// A stored value with its optional metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct KvEntry {
    pub value: Bytes,
    pub metadata: Option<serde_json::Value>,
}

/// Options for `get`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvGetOptions {
    pub cache_ttl: Option<u64>,
}

impl ToValue for KvGetOptions {
    fn to_value(&self) -> Value {
        ObjectBuilder::new().field("cacheTtl", self.cache_ttl).build()
    }
}

impl FromValue for KvGetOptions {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            cache_ttl: f.take("cacheTtl")?,
        })
    }
}

/// Options for `put`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvPutOptions {
    /// Absolute expiry, seconds since the epoch.
    pub expiration: Option<u64>,
    /// Relative expiry, seconds from now.
    pub expiration_ttl: Option<u64>,
    pub metadata: Option<serde_json::Value>,
}

impl ToValue for KvPutOptions {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("expiration", self.expiration)
            .field("expirationTtl", self.expiration_ttl)
            .field("metadata", &self.metadata)
            .build()
    }
}

impl FromValue for KvPutOptions {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            expiration: f.take("expiration")?,
            expiration_ttl: f.take("expirationTtl")?,
            metadata: f.take("metadata")?,
        })
    }
}

/// Options for `list`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvListOptions {
    pub prefix: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl ToValue for KvListOptions {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("prefix", &self.prefix)
            .field("limit", self.limit)
            .field("cursor", &self.cursor)
            .build()
    }
}

impl FromValue for KvListOptions {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            prefix: f.take("prefix")?,
            limit: f.take("limit")?,
            cursor: f.take("cursor")?,
        })
    }
}

/// One key in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvKey {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvListResult {
    pub keys: Vec<KvKey>,
    pub list_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Key-value namespace capability.
#[async_trait]
pub trait KvNamespace: Send + Sync {
    async fn get(&self, key: &str, options: KvGetOptions) -> BindingResult<Option<KvEntry>>;

    async fn put(&self, key: &str, value: Bytes, options: KvPutOptions) -> BindingResult<()>;

    async fn delete(&self, key: &str) -> BindingResult<()>;

    async fn list(&self, options: KvListOptions) -> BindingResult<KvListResult>;
}
