//! QUEUE handler.

use axum::response::Response;

use crate::bindings::queue::{BatchOptions, Queue, QueueMessage, SendOptions};
use crate::bindings::Module;
use crate::codec::{Envelope, Value};
use crate::handlers::empty;
use crate::routing::DispatchError;

pub async fn handle(queue: &dyn Queue, envelope: Envelope) -> Result<Response, DispatchError> {
    let (operation, mut params) = envelope.into_parts();
    match operation.as_deref() {
        Some("send") => {
            let body: Value = params.take(0)?;
            let options: Option<SendOptions> = params.take(1)?;
            let options = options.unwrap_or_default();
            queue
                .send(QueueMessage {
                    body,
                    content_type: options.content_type,
                    delay_seconds: options.delay_seconds,
                })
                .await?;
            Ok(empty())
        }
        Some("sendBatch") => {
            let mut messages: Vec<QueueMessage> = params.take(0)?;
            let options: Option<BatchOptions> = params.take(1)?;
            if let Some(delay) = options.and_then(|o| o.delay_seconds) {
                for message in &mut messages {
                    message.delay_seconds.get_or_insert(delay);
                }
            }
            queue.send_batch(messages).await?;
            Ok(empty())
        }
        _ => Err(DispatchError::unsupported(Module::Queue, operation)),
    }
}
