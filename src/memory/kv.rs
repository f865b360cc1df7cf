//! In-memory key-value namespace.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bindings::error::{BindingError, BindingResult};
use crate::bindings::kv::{
    KvEntry, KvGetOptions, KvKey, KvListOptions, KvListResult, KvNamespace, KvPutOptions,
    MAX_KV_LIST_LIMIT, MIN_EXPIRATION_TTL,
};

pub const MAX_KV_KEY_BYTES: usize = 512;
pub const MAX_KV_METADATA_BYTES: usize = 1024;

#[derive(Debug, Clone)]
struct StoredValue {
    value: Bytes,
    metadata: Option<serde_json::Value>,
    expiration: Option<u64>,
}

impl StoredValue {
    fn is_expired(&self, now: u64) -> bool {
        self.expiration.is_some_and(|at| at <= now)
    }
}

/// KV namespace kept in process memory. Expired keys are dropped lazily.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Arc<DashMap<String, StoredValue>>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn validate_key(key: &str) -> BindingResult<()> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(BindingError::invalid_argument(format!("Illegal key name \"{key}\"")));
    }
    if key.len() > MAX_KV_KEY_BYTES {
        return Err(BindingError::invalid_argument(format!(
            "key is {} bytes (max {MAX_KV_KEY_BYTES})",
            key.len()
        )));
    }
    Ok(())
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop `key` only if the entry currently stored is expired, so a
    /// concurrent `put` is never lost.
    fn evict_if_expired(&self, key: &str, now: u64) {
        self.entries.remove_if(key, |_, v| v.is_expired(now));
    }

    fn resolve_expiration(options: &KvPutOptions, now: u64) -> BindingResult<Option<u64>> {
        if let Some(ttl) = options.expiration_ttl {
            if ttl < MIN_EXPIRATION_TTL {
                return Err(BindingError::invalid_argument(format!(
                    "Invalid expiration_ttl of {ttl}. Expiration TTL must be at least {MIN_EXPIRATION_TTL}."
                )));
            }
            return now.checked_add(ttl).map(Some).ok_or_else(|| {
                BindingError::invalid_argument(format!(
                    "Invalid expiration_ttl of {ttl}. Expiration TTL is out of range."
                ))
            });
        }
        if let Some(at) = options.expiration {
            if at < now + MIN_EXPIRATION_TTL {
                return Err(BindingError::invalid_argument(format!(
                    "Invalid expiration of {at}. Expiration times must be at least {MIN_EXPIRATION_TTL} seconds in the future."
                )));
            }
            return Ok(Some(at));
        }
        Ok(None)
    }
}

#[async_trait]
impl KvNamespace for MemoryKv {
    async fn get(&self, key: &str, _options: KvGetOptions) -> BindingResult<Option<KvEntry>> {
        validate_key(key)?;
        let now = now_secs();
        let Some(stored) = self.entries.get(key).map(|e| e.clone()) else {
            return Ok(None);
        };
        if stored.is_expired(now) {
            self.evict_if_expired(key, now);
            return Ok(None);
        }
        Ok(Some(KvEntry {
            value: stored.value,
            metadata: stored.metadata,
        }))
    }

    async fn put(&self, key: &str, value: Bytes, options: KvPutOptions) -> BindingResult<()> {
        validate_key(key)?;
        let expiration = Self::resolve_expiration(&options, now_secs())?;
        if let Some(metadata) = &options.metadata {
            let size = serde_json::to_vec(metadata)
                .map_err(|e| BindingError::invalid_argument(e.to_string()))?
                .len();
            if size > MAX_KV_METADATA_BYTES {
                return Err(BindingError::invalid_argument(format!(
                    "metadata is {size} bytes (max {MAX_KV_METADATA_BYTES})"
                )));
            }
        }
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                metadata: options.metadata,
                expiration,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> BindingResult<()> {
        validate_key(key)?;
        self.entries.remove(key);
        Ok(())
    }

    async fn list(&self, options: KvListOptions) -> BindingResult<KvListResult> {
        let limit = options.limit.unwrap_or(MAX_KV_LIST_LIMIT);
        if limit == 0 || limit > MAX_KV_LIST_LIMIT {
            return Err(BindingError::invalid_argument(format!(
                "list limit must be between 1 and {MAX_KV_LIST_LIMIT}, got {limit}"
            )));
        }
        let now = now_secs();
        let prefix = options.prefix.as_deref().unwrap_or("");

        let live: BTreeMap<String, StoredValue> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().is_expired(now))
            .filter(|e| options.cursor.as_deref().map_or(true, |c| e.key().as_str() > c))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let total = live.len();
        let keys: Vec<KvKey> = live
            .into_iter()
            .take(limit as usize)
            .map(|(name, stored)| KvKey {
                name,
                expiration: stored.expiration,
                metadata: stored.metadata,
            })
            .collect();

        let list_complete = total <= limit as usize;
        let cursor = if list_complete {
            None
        } else {
            keys.last().map(|k| k.name.clone())
        };
        Ok(KvListResult {
            keys,
            list_complete,
            cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_delete() {
        let kv = MemoryKv::new();
        let options = KvPutOptions {
            metadata: Some(json!({ "v": 1 })),
            ..Default::default()
        };
        kv.put("a", Bytes::from_static(b"one"), options).await.unwrap();

        let entry = kv.get("a", KvGetOptions::default()).await.unwrap().unwrap();
        assert_eq!(entry.value, Bytes::from_static(b"one"));
        assert_eq!(entry.metadata, Some(json!({ "v": 1 })));

        kv.delete("a").await.unwrap();
        assert!(kv.get("a", KvGetOptions::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiration_validation() {
        let kv = MemoryKv::new();
        let short = KvPutOptions {
            expiration_ttl: Some(30),
            ..Default::default()
        };
        let err = kv.put("k", Bytes::new(), short).await.unwrap_err();
        assert!(err.message().contains("at least 60"));

        let ok = KvPutOptions {
            expiration_ttl: Some(60),
            ..Default::default()
        };
        kv.put("k", Bytes::new(), ok).await.unwrap();
        let listed = kv.list(KvListOptions::default()).await.unwrap();
        assert!(listed.keys[0].expiration.unwrap() >= now_secs() + 59);

        let past = KvPutOptions {
            expiration: Some(now_secs()),
            ..Default::default()
        };
        assert!(kv.put("k", Bytes::new(), past).await.is_err());
    }

    #[tokio::test]
    async fn test_huge_ttl_is_rejected() {
        let kv = MemoryKv::new();
        let huge = KvPutOptions {
            expiration_ttl: Some(u64::MAX),
            ..Default::default()
        };
        let err = kv.put("k", Bytes::new(), huge).await.unwrap_err();
        assert_eq!(err.kind(), crate::bindings::ErrorKind::InvalidArgument);
        assert!(kv.get("k", KvGetOptions::default()).await.unwrap().is_none());
    }

    #[test]
    fn test_eviction_keeps_a_fresh_replacement() {
        let kv = MemoryKv::new();
        let now = now_secs();
        kv.entries.insert(
            "k".into(),
            StoredValue {
                value: Bytes::from_static(b"new"),
                metadata: None,
                expiration: None,
            },
        );
        kv.evict_if_expired("k", now);
        assert!(kv.entries.contains_key("k"));

        kv.entries.insert(
            "k".into(),
            StoredValue {
                value: Bytes::from_static(b"old"),
                metadata: None,
                expiration: Some(now - 1),
            },
        );
        kv.evict_if_expired("k", now);
        assert!(!kv.entries.contains_key("k"));
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        let kv = MemoryKv::new();
        kv.entries.insert(
            "old".into(),
            StoredValue {
                value: Bytes::from_static(b"x"),
                metadata: None,
                expiration: Some(now_secs() - 1),
            },
        );
        assert!(kv.get("old", KvGetOptions::default()).await.unwrap().is_none());
        assert!(kv.list(KvListOptions::default()).await.unwrap().keys.is_empty());
    }

    #[tokio::test]
    async fn test_list_pages_by_cursor() {
        let kv = MemoryKv::new();
        for key in ["user:1", "user:2", "user:3", "other"] {
            kv.put(key, Bytes::new(), KvPutOptions::default()).await.unwrap();
        }
        let first = kv
            .list(KvListOptions {
                prefix: Some("user:".into()),
                limit: Some(2),
                cursor: None,
            })
            .await
            .unwrap();
        assert!(!first.list_complete);
        let names: Vec<_> = first.keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["user:1", "user:2"]);

        let second = kv
            .list(KvListOptions {
                prefix: Some("user:".into()),
                limit: Some(2),
                cursor: first.cursor,
            })
            .await
            .unwrap();
        assert!(second.list_complete);
        assert_eq!(second.keys[0].name, "user:3");
        assert!(second.cursor.is_none());
    }

    #[tokio::test]
    async fn test_illegal_keys() {
        let kv = MemoryKv::new();
        assert!(kv.get("", KvGetOptions::default()).await.is_err());
        assert!(kv.delete("..").await.is_err());
        let long = "k".repeat(MAX_KV_KEY_BYTES + 1);
        assert!(kv.put(&long, Bytes::new(), KvPutOptions::default()).await.is_err());
    }
}
