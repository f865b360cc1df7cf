//! In-memory object store.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{SubsecRound, Utc};
use dashmap::DashMap;
use futures_util::StreamExt;
use sha2::{Digest, Sha256 as Sha256Hasher};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::bindings::error::{BindingError, BindingResult, ErrorKind};
use crate::bindings::r2::{
    byte_stream, ByteStream, Checksums, Conditional, GetOptions, GetOutcome, Include, ListOptions,
    ObjectMeta, ObjectStore, Objects, PutOptions, MAX_LIST_LIMIT,
};

/// Maximum key length in bytes.
pub const MAX_KEY_BYTES: usize = 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    meta: ObjectMeta,
    body: Bytes,
}

/// Object store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<DashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn count(&self) -> usize {
        self.objects.len()
    }

    fn validate_key(key: &str) -> BindingResult<()> {
        if key.is_empty() {
            return Err(BindingError::invalid_argument("object key must not be empty"));
        }
        if key.len() > MAX_KEY_BYTES {
            return Err(BindingError::invalid_argument(format!(
                "object key is {} bytes (max {MAX_KEY_BYTES})",
                key.len()
            )));
        }
        Ok(())
    }

    fn current_meta(&self, key: &str) -> Option<ObjectMeta> {
        self.objects.get(key).map(|o| o.meta.clone())
    }
}

async fn collect(mut stream: ByteStream) -> BindingResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

fn without_unrequested(mut meta: ObjectMeta, include: &[Include]) -> ObjectMeta {
    if !include.contains(&Include::HttpMetadata) {
        meta.http_metadata = Default::default();
    }
    if !include.contains(&Include::CustomMetadata) {
        meta.custom_metadata = BTreeMap::new();
    }
    meta
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn head(&self, key: &str) -> BindingResult<Option<ObjectMeta>> {
        Self::validate_key(key)?;
        Ok(self.current_meta(key))
    }

    async fn get(&self, key: &str, options: GetOptions) -> BindingResult<GetOutcome> {
        Self::validate_key(key)?;
        let Some(stored) = self.objects.get(key).map(|o| o.clone()) else {
            return Ok(GetOutcome::Absent);
        };

        if let Some(only_if) = &options.only_if {
            if !only_if.resolve()?.is_satisfied_by(&stored.meta) {
                return Ok(GetOutcome::MetadataOnly(stored.meta));
            }
        }

        let mut meta = stored.meta;
        let body = match options.range {
            Some(range) => {
                let resolved = range.resolve(meta.size)?;
                meta.range = Some(resolved);
                let start = resolved.offset as usize;
                stored.body.slice(start..start + resolved.length as usize)
            }
            None => stored.body,
        };
        Ok(GetOutcome::WithBody(meta, byte_stream(body)))
    }

    async fn put(
        &self,
        key: &str,
        value: ByteStream,
        options: PutOptions,
    ) -> BindingResult<Option<ObjectMeta>> {
        Self::validate_key(key)?;

        if let Some(only_if) = &options.only_if {
            let cond: Conditional = only_if.resolve()?;
            let satisfied = match self.current_meta(key) {
                Some(existing) => cond.is_satisfied_by(&existing),
                None => cond.etag_matches.is_none(),
            };
            if !satisfied {
                tracing::debug!(key = %key, "Put precondition failed");
                return Ok(None);
            }
        }

        let body = collect(value).await?;
        let digest = hex::encode(Sha256Hasher::digest(&body));

        let mut checksums = Checksums::default();
        if let Some(expected) = &options.sha256 {
            if expected.to_hex() != digest {
                return Err(BindingError::new(
                    ErrorKind::ChecksumMismatch,
                    "The SHA-256 checksum you specified did not match what we received.",
                ));
            }
            checksums.sha256 = Some(digest.clone());
        }

        let etag = digest[..32].to_string();
        let meta = ObjectMeta {
            key: key.to_string(),
            version: Uuid::new_v4().simple().to_string(),
            size: body.len() as u64,
            http_etag: format!("\"{etag}\""),
            etag,
            uploaded: Utc::now().trunc_subsecs(3),
            http_metadata: options
                .http_metadata
                .as_ref()
                .map(|m| m.resolve())
                .unwrap_or_default(),
            custom_metadata: options.custom_metadata.unwrap_or_default(),
            checksums,
            range: None,
            storage_class: "Standard".to_string(),
        };

        self.objects.insert(
            key.to_string(),
            StoredObject {
                meta: meta.clone(),
                body,
            },
        );
        Ok(Some(meta))
    }

    async fn delete(&self, keys: &[String]) -> BindingResult<()> {
        for key in keys {
            Self::validate_key(key)?;
        }
        for key in keys {
            self.objects.remove(key);
        }
        Ok(())
    }

    async fn list(&self, options: ListOptions) -> BindingResult<Objects> {
        let limit = options.limit.unwrap_or(MAX_LIST_LIMIT);
        if limit == 0 || limit > MAX_LIST_LIMIT {
            return Err(BindingError::invalid_argument(format!(
                "list limit must be between 1 and {MAX_LIST_LIMIT}, got {limit}"
            )));
        }
        let prefix = options.prefix.as_deref().unwrap_or("");
        let after = [options.cursor.as_deref(), options.start_after.as_deref()]
            .into_iter()
            .flatten()
            .max()
            .map(str::to_string);

        let snapshot: BTreeMap<String, ObjectMeta> = self
            .objects
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .filter(|e| after.as_deref().map_or(true, |a| e.key().as_str() > a))
            .map(|e| (e.key().clone(), e.value().meta.clone()))
            .collect();

        let mut result = Objects::default();
        let mut prefixes = BTreeSet::new();
        let mut emitted = 0u32;
        let mut last_key = None;

        for (key, meta) in snapshot {
            if let Some(delimiter) = options.delimiter.as_deref().filter(|d| !d.is_empty()) {
                if let Some(pos) = key[prefix.len()..].find(delimiter) {
                    let group = key[..prefix.len() + pos + delimiter.len()].to_string();
                    if prefixes.contains(&group) {
                        last_key = Some(key);
                        continue;
                    }
                    if emitted == limit {
                        result.truncated = true;
                        break;
                    }
                    prefixes.insert(group);
                    emitted += 1;
                    last_key = Some(key);
                    continue;
                }
            }
            if emitted == limit {
                result.truncated = true;
                break;
            }
            result.objects.push(without_unrequested(meta, &options.include));
            emitted += 1;
            last_key = Some(key);
        }

        if result.truncated {
            result.cursor = last_key;
        }
        result.delimited_prefixes = prefixes.into_iter().collect();
        Ok(result)
    }
}
