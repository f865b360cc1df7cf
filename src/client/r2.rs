//! Object storage proxy.
//!
//! `R2Bucket` mirrors the native bucket surface (`head`, `get`, `put`,
//! `delete`, `list`) and sends each call to the bridge as one dispatch.
//! Object content is never placed in the envelope: `put` streams it as the
//! request body and `get` streams it back as the response body.

use std::collections::BTreeMap;
use std::ops::Deref;

use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;

use crate::bindings::r2::{
    byte_stream, ByteRange, ByteStream, Checksums, DeleteKeys, GetOptions, HttpMetadata,
    ListOptions, ObjectMeta, Objects, PutOptions,
};
use crate::client::dispatch::{header_json, BridgeError, Dispatcher};
use crate::codec::{ToValue, Value};
use crate::headers;

/// Characters left unescaped in keys, matching URI component encoding.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode an object key for transport.
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ENCODE_SET).to_string()
}

/// Object metadata as seen by a client.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadResult(ObjectMeta);

impl HeadResult {
    pub fn new(meta: ObjectMeta) -> Self {
        Self(meta)
    }

    pub fn key(&self) -> &str {
        &self.0.key
    }

    pub fn version(&self) -> &str {
        &self.0.version
    }

    pub fn size(&self) -> u64 {
        self.0.size
    }

    pub fn etag(&self) -> &str {
        &self.0.etag
    }

    pub fn http_etag(&self) -> &str {
        &self.0.http_etag
    }

    pub fn uploaded(&self) -> DateTime<Utc> {
        self.0.uploaded
    }

    pub fn http_metadata(&self) -> &HttpMetadata {
        &self.0.http_metadata
    }

    pub fn custom_metadata(&self) -> &BTreeMap<String, String> {
        &self.0.custom_metadata
    }

    pub fn checksums(&self) -> &Checksums {
        &self.0.checksums
    }

    pub fn range(&self) -> Option<ByteRange> {
        self.0.range
    }

    pub fn storage_class(&self) -> &str {
        &self.0.storage_class
    }

    /// Write the stored HTTP metadata as response headers.
    pub fn write_http_metadata(&self, headers: &mut HeaderMap) {
        self.0.http_metadata.write_headers(headers);
    }

    pub fn meta(&self) -> &ObjectMeta {
        &self.0
    }

    pub fn into_meta(self) -> ObjectMeta {
        self.0
    }
}

/// Object metadata plus its streamed content.
pub struct ObjectBody {
    head: HeadResult,
    body: ByteStream,
}

impl ObjectBody {
    pub fn new(head: HeadResult, body: ByteStream) -> Self {
        Self { head, body }
    }

    pub fn head(&self) -> &HeadResult {
        &self.head
    }

    /// Take the content as a stream.
    pub fn into_stream(self) -> ByteStream {
        self.body
    }

    /// Collect the whole content.
    pub async fn bytes(self) -> Result<Bytes, BridgeError> {
        let mut stream = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BridgeError::InvalidResponse(format!("body stream: {e}")))?;
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    pub async fn text(self) -> Result<String, BridgeError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| BridgeError::InvalidResponse(format!("body is not UTF-8: {e}")))
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, BridgeError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Deref for ObjectBody {
    type Target = HeadResult;

    fn deref(&self) -> &HeadResult {
        &self.head
    }
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody").field("head", &self.head).finish_non_exhaustive()
    }
}

/// Result of [`R2Bucket::get`].
#[derive(Debug)]
pub enum ObjectGet {
    Absent,
    /// The precondition failed; metadata only.
    MetadataOnly(HeadResult),
    WithBody(ObjectBody),
}

impl ObjectGet {
    /// The body, when one was returned.
    pub fn into_body(self) -> Option<ObjectBody> {
        match self {
            ObjectGet::WithBody(body) => Some(body),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ObjectGet::Absent)
    }
}

/// Content accepted by [`R2Bucket::put`].
pub enum PutBody {
    Empty,
    Bytes(Bytes),
    Stream(ByteStream),
}

impl PutBody {
    fn into_stream(self) -> ByteStream {
        match self {
            PutBody::Empty => byte_stream(Bytes::new()),
            PutBody::Bytes(b) => byte_stream(b),
            PutBody::Stream(s) => s,
        }
    }
}

impl From<Bytes> for PutBody {
    fn from(b: Bytes) -> Self {
        PutBody::Bytes(b)
    }
}

impl From<Vec<u8>> for PutBody {
    fn from(b: Vec<u8>) -> Self {
        PutBody::Bytes(Bytes::from(b))
    }
}

impl From<&'static str> for PutBody {
    fn from(s: &'static str) -> Self {
        PutBody::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for PutBody {
    fn from(s: String) -> Self {
        PutBody::Bytes(Bytes::from(s))
    }
}

impl From<ByteStream> for PutBody {
    fn from(s: ByteStream) -> Self {
        PutBody::Stream(s)
    }
}

/// One page of a listing, with each object wrapped in a [`HeadResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectList {
    pub objects: Vec<HeadResult>,
    pub truncated: bool,
    pub cursor: Option<String>,
    pub delimited_prefixes: Vec<String>,
}

impl From<Objects> for ObjectList {
    fn from(o: Objects) -> Self {
        Self {
            objects: o.objects.into_iter().map(HeadResult::new).collect(),
            truncated: o.truncated,
            cursor: o.cursor,
            delimited_prefixes: o.delimited_prefixes,
        }
    }
}

/// Proxy for an R2 binding hosted by a bridge.
#[derive(Debug, Clone)]
pub struct R2Bucket {
    dispatcher: Dispatcher,
}

impl R2Bucket {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn head(&self, key: &str) -> Result<Option<HeadResult>, BridgeError> {
        let meta: Option<ObjectMeta> = self
            .dispatcher
            .json("head", &[Value::from(encode_key(key))])
            .await?;
        Ok(meta.map(HeadResult::new))
    }

    pub async fn get(&self, key: &str, options: GetOptions) -> Result<ObjectGet, BridgeError> {
        let params = [Value::from(encode_key(key)), options.to_value()];
        let response = self.dispatcher.send("get", &params, None).await?;

        if let Some(meta) = header_json::<ObjectMeta>(&response, &headers::R2_OBJECT_JSON)? {
            let body = response
                .bytes_stream()
                .map_err(std::io::Error::other)
                .boxed();
            return Ok(ObjectGet::WithBody(ObjectBody::new(HeadResult::new(meta), body)));
        }

        let bytes = response.bytes().await?;
        let meta: Option<ObjectMeta> = serde_json::from_slice(&bytes)?;
        Ok(match meta {
            None => ObjectGet::Absent,
            Some(meta) => ObjectGet::MetadataOnly(HeadResult::new(meta)),
        })
    }

    /// Store `value`. `None` when a precondition in `options` failed.
    pub async fn put(
        &self,
        key: &str,
        value: impl Into<PutBody>,
        options: PutOptions,
    ) -> Result<Option<HeadResult>, BridgeError> {
        let params = [Value::from(encode_key(key)), Value::Null, options.to_value()];
        let body = reqwest::Body::wrap_stream(value.into().into_stream());
        let response = self.dispatcher.send("put", &params, Some(body)).await?;
        let bytes = response.bytes().await?;
        let meta: Option<ObjectMeta> = serde_json::from_slice(&bytes)?;
        Ok(meta.map(HeadResult::new))
    }

    /// Delete one key or a list of keys.
    pub async fn delete(&self, keys: impl Into<DeleteKeys>) -> Result<(), BridgeError> {
        let keys = keys.into().map(|k| encode_key(&k));
        self.dispatcher.unit("delete", &[keys.to_value()], None).await
    }

    pub async fn list(&self, options: ListOptions) -> Result<ObjectList, BridgeError> {
        let objects: Objects = self.dispatcher.json("list", &[options.to_value()]).await?;
        Ok(objects.into())
    }
}
