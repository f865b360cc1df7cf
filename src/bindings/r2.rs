//! Object storage (R2) binding contract.
//!
//! # Responsibilities
//! - Define the `ObjectStore` capability hosted behind the bridge
//! - Define object metadata and the option types carried by the codec
//! - Evaluate conditional (precondition) requests against stored metadata
//!
//! # Design Decisions
//! - Metadata travels as plain JSON (serde), options travel through the codec
//!   because they may contain dates, header collections and binary checksums
//! - `get` returns an explicit three-way outcome; a failed precondition is a
//!   result, not an error

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bindings::error::{BindingError, BindingResult};
use crate::codec::{CodecError, FromValue, HeaderList, ObjectBuilder, ObjectFields, ToValue, Value};

/// Streamed object content.
pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Wrap an in-memory buffer as a [`ByteStream`].
pub fn byte_stream(bytes: Bytes) -> ByteStream {
    stream::once(async move { Ok(bytes) }).boxed()
}

/// Default and maximum page size for `list`.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Object metadata as returned by `head`, `put`, `list` and `get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub key: String,
    pub version: String,
    pub size: u64,
    pub etag: String,
    pub http_etag: String,
    pub uploaded: DateTime<Utc>,
    #[serde(default)]
    pub http_metadata: HttpMetadata,
    #[serde(default)]
    pub custom_metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub checksums: Checksums,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<ByteRange>,
    #[serde(default = "default_storage_class")]
    pub storage_class: String,
}

fn default_storage_class() -> String {
    "Standard".to_string()
}

/// Checksums recorded for an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checksums {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Resolved byte range of a ranged read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

/// Standard HTTP metadata stored with an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_expiry: Option<DateTime<Utc>>,
}

impl HttpMetadata {
    /// Read metadata from response-style headers.
    pub fn from_headers(headers: &HeaderList) -> Self {
        Self {
            content_type: headers.get("content-type").map(str::to_string),
            content_language: headers.get("content-language").map(str::to_string),
            content_disposition: headers.get("content-disposition").map(str::to_string),
            content_encoding: headers.get("content-encoding").map(str::to_string),
            cache_control: headers.get("cache-control").map(str::to_string),
            cache_expiry: headers.get("expires").and_then(parse_http_date),
        }
    }

    /// Write metadata as response headers. Invalid values are skipped.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        let expires = self.cache_expiry.map(format_http_date);
        let pairs = [
            ("content-type", self.content_type.as_deref()),
            ("content-language", self.content_language.as_deref()),
            ("content-disposition", self.content_disposition.as_deref()),
            ("content-encoding", self.content_encoding.as_deref()),
            ("cache-control", self.cache_control.as_deref()),
            ("expires", expires.as_deref()),
        ];
        for (name, value) in pairs {
            if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
    }
}

impl ToValue for HttpMetadata {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("contentType", &self.content_type)
            .field("contentLanguage", &self.content_language)
            .field("contentDisposition", &self.content_disposition)
            .field("contentEncoding", &self.content_encoding)
            .field("cacheControl", &self.cache_control)
            .field("cacheExpiry", &self.cache_expiry)
            .build()
    }
}

impl FromValue for HttpMetadata {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            content_type: f.take("contentType")?,
            content_language: f.take("contentLanguage")?,
            content_disposition: f.take("contentDisposition")?,
            content_encoding: f.take("contentEncoding")?,
            cache_control: f.take("cacheControl")?,
            cache_expiry: f.take("cacheExpiry")?,
        })
    }
}

/// Parse an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// HTTP metadata given either as fields or as a header collection.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpMetadataInit {
    Fields(HttpMetadata),
    Headers(HeaderList),
}

impl HttpMetadataInit {
    pub fn resolve(&self) -> HttpMetadata {
        match self {
            HttpMetadataInit::Fields(m) => m.clone(),
            HttpMetadataInit::Headers(h) => HttpMetadata::from_headers(h),
        }
    }
}

impl ToValue for HttpMetadataInit {
    fn to_value(&self) -> Value {
        match self {
            HttpMetadataInit::Fields(m) => m.to_value(),
            HttpMetadataInit::Headers(h) => h.to_value(),
        }
    }
}

impl FromValue for HttpMetadataInit {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Headers(h) => Ok(HttpMetadataInit::Headers(h)),
            other => HttpMetadata::from_value(other).map(HttpMetadataInit::Fields),
        }
    }
}

/// Conditions evaluated against stored metadata before returning a body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditional {
    pub etag_matches: Option<String>,
    pub etag_does_not_match: Option<String>,
    pub uploaded_before: Option<DateTime<Utc>>,
    pub uploaded_after: Option<DateTime<Utc>>,
}

impl Conditional {
    /// Map `If-*` request headers onto the conditional fields.
    pub fn from_headers(headers: &HeaderList) -> Result<Self, BindingError> {
        let date = |name: &str| -> Result<Option<DateTime<Utc>>, BindingError> {
            match headers.get(name) {
                None => Ok(None),
                Some(text) => parse_http_date(text)
                    .map(Some)
                    .ok_or_else(|| BindingError::invalid_argument(format!("invalid {name} date: {text}"))),
            }
        };
        Ok(Self {
            etag_matches: headers.get("if-match").map(str::to_string),
            etag_does_not_match: headers.get("if-none-match").map(str::to_string),
            uploaded_before: date("if-unmodified-since")?,
            uploaded_after: date("if-modified-since")?,
        })
    }

    /// True when the object's body should be returned.
    ///
    /// A satisfied etag condition overrides the matching date condition.
    pub fn is_satisfied_by(&self, meta: &ObjectMeta) -> bool {
        let mut date_before_checked = true;
        let mut date_after_checked = true;

        if let Some(expected) = &self.etag_matches {
            if !etag_list_contains(expected, &meta.etag) {
                return false;
            }
            date_before_checked = false;
        }
        if let Some(rejected) = &self.etag_does_not_match {
            if etag_list_contains(rejected, &meta.etag) {
                return false;
            }
            date_after_checked = false;
        }
        if date_before_checked {
            if let Some(before) = self.uploaded_before {
                if meta.uploaded >= before {
                    return false;
                }
            }
        }
        if date_after_checked {
            if let Some(after) = self.uploaded_after {
                if meta.uploaded <= after {
                    return false;
                }
            }
        }
        true
    }
}

/// Match an etag against a comma-separated list that may contain `*`,
/// quoted and weak (`W/`) entries.
fn etag_list_contains(list: &str, etag: &str) -> bool {
    list.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return true;
        }
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate.trim_matches('"') == etag
    })
}

impl ToValue for Conditional {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("etagMatches", &self.etag_matches)
            .field("etagDoesNotMatch", &self.etag_does_not_match)
            .field("uploadedBefore", &self.uploaded_before)
            .field("uploadedAfter", &self.uploaded_after)
            .build()
    }
}

impl FromValue for Conditional {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            etag_matches: f.take("etagMatches")?,
            etag_does_not_match: f.take("etagDoesNotMatch")?,
            uploaded_before: f.take("uploadedBefore")?,
            uploaded_after: f.take("uploadedAfter")?,
        })
    }
}

/// Precondition given either as fields or as `If-*` headers.
#[derive(Debug, Clone, PartialEq)]
pub enum OnlyIf {
    Conditional(Conditional),
    Headers(HeaderList),
}

impl OnlyIf {
    pub fn resolve(&self) -> Result<Conditional, BindingError> {
        match self {
            OnlyIf::Conditional(c) => Ok(c.clone()),
            OnlyIf::Headers(h) => Conditional::from_headers(h),
        }
    }
}

impl From<Conditional> for OnlyIf {
    fn from(c: Conditional) -> Self {
        OnlyIf::Conditional(c)
    }
}

impl ToValue for OnlyIf {
    fn to_value(&self) -> Value {
        match self {
            OnlyIf::Conditional(c) => c.to_value(),
            OnlyIf::Headers(h) => h.to_value(),
        }
    }
}

impl FromValue for OnlyIf {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Headers(h) => Ok(OnlyIf::Headers(h)),
            other => Conditional::from_value(other).map(OnlyIf::Conditional),
        }
    }
}

/// Requested byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    /// From `offset` (default 0), `length` bytes (default: to the end).
    Slice {
        offset: Option<u64>,
        length: Option<u64>,
    },
    /// The last `suffix` bytes.
    Suffix(u64),
}

impl Range {
    /// Resolve against an object size, clamping to the available bytes.
    pub fn resolve(&self, size: u64) -> Result<ByteRange, BindingError> {
        match *self {
            Range::Slice { offset, length } => {
                let offset = offset.unwrap_or(0);
                if offset > size {
                    return Err(BindingError::invalid_argument(format!(
                        "range offset {offset} is beyond object size {size}"
                    )));
                }
                let length = length.unwrap_or(size - offset).min(size - offset);
                Ok(ByteRange { offset, length })
            }
            Range::Suffix(suffix) => {
                let length = suffix.min(size);
                Ok(ByteRange {
                    offset: size - length,
                    length,
                })
            }
        }
    }
}

impl ToValue for Range {
    fn to_value(&self) -> Value {
        match *self {
            Range::Slice { offset, length } => ObjectBuilder::new()
                .field("offset", offset)
                .field("length", length)
                .build(),
            Range::Suffix(suffix) => ObjectBuilder::new().field("suffix", suffix).build(),
        }
    }
}

impl FromValue for Range {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        if f.contains("suffix") {
            return Ok(Range::Suffix(f.require("suffix")?));
        }
        Ok(Range::Slice {
            offset: f.take("offset")?,
            length: f.take("length")?,
        })
    }
}

/// Options for `get`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOptions {
    pub only_if: Option<OnlyIf>,
    pub range: Option<Range>,
}

impl ToValue for GetOptions {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("onlyIf", &self.only_if)
            .field("range", &self.range)
            .build()
    }
}

impl FromValue for GetOptions {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            only_if: f.take("onlyIf")?,
            range: f.take("range")?,
        })
    }
}

/// Expected SHA-256 of the uploaded content, raw or hex encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Sha256 {
    Raw(Bytes),
    Hex(String),
}

impl Sha256 {
    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        match self {
            Sha256::Raw(b) => hex::encode(b),
            Sha256::Hex(h) => h.to_ascii_lowercase(),
        }
    }
}

impl ToValue for Sha256 {
    fn to_value(&self) -> Value {
        match self {
            Sha256::Raw(b) => Value::Bytes(b.clone()),
            Sha256::Hex(h) => Value::String(h.clone()),
        }
    }
}

impl FromValue for Sha256 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bytes(b) => Ok(Sha256::Raw(b)),
            Value::String(s) => Ok(Sha256::Hex(s)),
            other => Err(CodecError::TypeMismatch {
                expected: "ArrayBuffer or string",
                actual: other.type_name(),
            }),
        }
    }
}

/// Options for `put`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutOptions {
    pub http_metadata: Option<HttpMetadataInit>,
    pub custom_metadata: Option<BTreeMap<String, String>>,
    pub sha256: Option<Sha256>,
    pub only_if: Option<OnlyIf>,
}

impl ToValue for PutOptions {
    fn to_value(&self) -> Value {
        ObjectBuilder::new()
            .field("httpMetadata", &self.http_metadata)
            .field("customMetadata", &self.custom_metadata)
            .field("sha256", &self.sha256)
            .field("onlyIf", &self.only_if)
            .build()
    }
}

impl FromValue for PutOptions {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            http_metadata: f.take("httpMetadata")?,
            custom_metadata: f.take("customMetadata")?,
            sha256: f.take("sha256")?,
            only_if: f.take("onlyIf")?,
        })
    }
}

/// Metadata groups `list` may include per object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Include {
    HttpMetadata,
    CustomMetadata,
}

impl Include {
    pub fn as_str(&self) -> &'static str {
        match self {
            Include::HttpMetadata => "httpMetadata",
            Include::CustomMetadata => "customMetadata",
        }
    }
}

impl ToValue for Include {
    fn to_value(&self) -> Value {
        Value::from(self.as_str())
    }
}

impl FromValue for Include {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value.as_str() {
            Some("httpMetadata") => Ok(Include::HttpMetadata),
            Some("customMetadata") => Ok(Include::CustomMetadata),
            Some(other) => Err(CodecError::InvalidPayload {
                tag: "include",
                reason: format!("unknown include `{other}`"),
            }),
            None => Err(CodecError::TypeMismatch {
                expected: "string",
                actual: value.type_name(),
            }),
        }
    }
}

/// Options for `list`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub limit: Option<u32>,
    pub prefix: Option<String>,
    pub cursor: Option<String>,
    pub delimiter: Option<String>,
    pub start_after: Option<String>,
    pub include: Vec<Include>,
}

impl ToValue for ListOptions {
    fn to_value(&self) -> Value {
        let include = (!self.include.is_empty()).then_some(&self.include);
        ObjectBuilder::new()
            .field("limit", self.limit)
            .field("prefix", &self.prefix)
            .field("cursor", &self.cursor)
            .field("delimiter", &self.delimiter)
            .field("startAfter", &self.start_after)
            .field("include", include)
            .build()
    }
}

impl FromValue for ListOptions {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut f = ObjectFields::new(value)?;
        Ok(Self {
            limit: f.take("limit")?,
            prefix: f.take("prefix")?,
            cursor: f.take("cursor")?,
            delimiter: f.take("delimiter")?,
            start_after: f.take("startAfter")?,
            include: f.take::<Option<Vec<Include>>>("include")?.unwrap_or_default(),
        })
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objects {
    pub objects: Vec<ObjectMeta>,
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default)]
    pub delimited_prefixes: Vec<String>,
}

/// Keys accepted by `delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteKeys {
    One(String),
    Many(Vec<String>),
}

impl DeleteKeys {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            DeleteKeys::One(k) => vec![k],
            DeleteKeys::Many(ks) => ks,
        }
    }

    /// Apply `f` to every key, keeping the single/list shape.
    pub fn map(self, f: impl Fn(String) -> String) -> Self {
        match self {
            DeleteKeys::One(k) => DeleteKeys::One(f(k)),
            DeleteKeys::Many(ks) => DeleteKeys::Many(ks.into_iter().map(f).collect()),
        }
    }
}

impl From<&str> for DeleteKeys {
    fn from(k: &str) -> Self {
        DeleteKeys::One(k.to_string())
    }
}

impl From<String> for DeleteKeys {
    fn from(k: String) -> Self {
        DeleteKeys::One(k)
    }
}

impl From<Vec<String>> for DeleteKeys {
    fn from(ks: Vec<String>) -> Self {
        DeleteKeys::Many(ks)
    }
}

impl From<&[&str]> for DeleteKeys {
    fn from(ks: &[&str]) -> Self {
        DeleteKeys::Many(ks.iter().map(|k| k.to_string()).collect())
    }
}

impl ToValue for DeleteKeys {
    fn to_value(&self) -> Value {
        match self {
            DeleteKeys::One(k) => k.to_value(),
            DeleteKeys::Many(ks) => ks.to_value(),
        }
    }
}

impl FromValue for DeleteKeys {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::String(k) => Ok(DeleteKeys::One(k)),
            Value::Array(_) => Vec::<String>::from_value(value).map(DeleteKeys::Many),
            other => Err(CodecError::TypeMismatch {
                expected: "string or array of strings",
                actual: other.type_name(),
            }),
        }
    }
}

/// Outcome of `get`.
pub enum GetOutcome {
    /// Key does not exist.
    Absent,
    /// Key exists but the precondition failed; no body.
    MetadataOnly(ObjectMeta),
    /// Key exists and the precondition held.
    WithBody(ObjectMeta, ByteStream),
}

impl std::fmt::Debug for GetOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GetOutcome::Absent => f.write_str("Absent"),
            GetOutcome::MetadataOnly(m) => f.debug_tuple("MetadataOnly").field(&m.key).finish(),
            GetOutcome::WithBody(m, _) => f.debug_tuple("WithBody").field(&m.key).finish(),
        }
    }
}

/// Object storage capability.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head(&self, key: &str) -> BindingResult<Option<ObjectMeta>>;

    async fn get(&self, key: &str, options: GetOptions) -> BindingResult<GetOutcome>;

    /// Store `value`. `None` when a precondition in `options` failed.
    async fn put(
        &self,
        key: &str,
        value: ByteStream,
        options: PutOptions,
    ) -> BindingResult<Option<ObjectMeta>>;

    async fn delete(&self, keys: &[String]) -> BindingResult<()>;

    async fn list(&self, options: ListOptions) -> BindingResult<Objects>;
}
