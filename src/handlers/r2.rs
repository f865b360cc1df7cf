//! R2 (object storage) handler.

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Json;
use percent_encoding::percent_decode_str;

use crate::bindings::r2::{DeleteKeys, GetOptions, GetOutcome, ListOptions, ObjectStore, PutOptions};
use crate::bindings::{BindingError, Module};
use crate::codec::Envelope;
use crate::handlers::{body_stream, empty, json_header};
use crate::headers;
use crate::routing::DispatchError;

/// Percent-decode a key exactly once.
pub fn decode_key(key: &str) -> Result<String, BindingError> {
    percent_decode_str(key)
        .decode_utf8()
        .map(|k| k.into_owned())
        .map_err(|e| BindingError::invalid_argument(format!("object key is not valid UTF-8: {e}")))
}

pub async fn handle(
    store: &dyn ObjectStore,
    envelope: Envelope,
    request: Request<Body>,
) -> Result<Response, DispatchError> {
    let (operation, mut params) = envelope.into_parts();
    match operation.as_deref() {
        Some("head") => {
            let key = decode_key(&params.take::<String>(0)?)?;
            let meta = store.head(&key).await?;
            Ok(Json(meta).into_response())
        }
        Some("get") => {
            let key = decode_key(&params.take::<String>(0)?)?;
            let options: Option<GetOptions> = params.take(1)?;
            match store.get(&key, options.unwrap_or_default()).await? {
                GetOutcome::Absent => Ok(Json(serde_json::Value::Null).into_response()),
                GetOutcome::MetadataOnly(meta) => Ok(Json(meta).into_response()),
                GetOutcome::WithBody(meta, stream) => {
                    let mut response = Body::from_stream(stream).into_response();
                    response
                        .headers_mut()
                        .insert(headers::R2_OBJECT_JSON, json_header(&meta)?);
                    Ok(response)
                }
            }
        }
        Some("put") => {
            let key = decode_key(&params.take::<String>(0)?)?;
            let options: Option<PutOptions> = params.take(2)?;
            let value = body_stream(request.into_body());
            let meta = store.put(&key, value, options.unwrap_or_default()).await?;
            Ok(Json(meta).into_response())
        }
        Some("delete") => {
            let keys: DeleteKeys = params.take(0)?;
            let keys = keys
                .into_vec()
                .iter()
                .map(|k| decode_key(k))
                .collect::<Result<Vec<_>, _>>()?;
            store.delete(&keys).await?;
            Ok(empty())
        }
        Some("list") => {
            let options: Option<ListOptions> = params.take(0)?;
            let objects = store.list(options.unwrap_or_default()).await?;
            Ok(Json(objects).into_response())
        }
        _ => Err(DispatchError::unsupported(Module::R2, operation)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_key_once() {
        assert_eq!(decode_key("a%20b").unwrap(), "a b");
        assert_eq!(decode_key("100%2525").unwrap(), "100%25");
        assert_eq!(decode_key("plain/key").unwrap(), "plain/key");
        assert!(decode_key("%FF").is_err());
    }
}
