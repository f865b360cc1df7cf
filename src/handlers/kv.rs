//! KV handler.

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::bindings::kv::{KvGetOptions, KvListOptions, KvNamespace, KvPutOptions};
use crate::bindings::{BindingError, Module};
use crate::codec::Envelope;
use crate::handlers::{empty, json_header};
use crate::headers;
use crate::routing::DispatchError;

pub async fn handle(
    kv: &dyn KvNamespace,
    envelope: Envelope,
    request: Request<Body>,
) -> Result<Response, DispatchError> {
    let (operation, mut params) = envelope.into_parts();
    match operation.as_deref() {
        Some("get") => {
            let key: String = params.take(0)?;
            let options: Option<KvGetOptions> = params.take(1)?;
            match kv.get(&key, options.unwrap_or_default()).await? {
                None => Ok(Json(serde_json::Value::Null).into_response()),
                Some(entry) => {
                    let metadata = entry.metadata.unwrap_or(serde_json::Value::Null);
                    let mut response = Body::from(entry.value).into_response();
                    response
                        .headers_mut()
                        .insert(headers::KV_METADATA, json_header(&metadata)?);
                    Ok(response)
                }
            }
        }
        Some("put") => {
            let key: String = params.take(0)?;
            let options: Option<KvPutOptions> = params.take(2)?;
            let value = axum::body::to_bytes(request.into_body(), usize::MAX)
                .await
                .map_err(|e| BindingError::internal(format!("failed to read value: {e}")))?;
            kv.put(&key, value, options.unwrap_or_default()).await?;
            Ok(empty())
        }
        Some("delete") => {
            let key: String = params.take(0)?;
            kv.delete(&key).await?;
            Ok(empty())
        }
        Some("list") => {
            let options: Option<KvListOptions> = params.take(0)?;
            let result = kv.list(options.unwrap_or_default()).await?;
            Ok(Json(result).into_response())
        }
        _ => Err(DispatchError::unsupported(Module::Kv, operation)),
    }
}
