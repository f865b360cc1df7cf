//! Queue producer proxy.

use crate::bindings::queue::{BatchOptions, QueueMessage, SendOptions};
use crate::client::dispatch::{BridgeError, Dispatcher};
use crate::codec::{ToValue, Value};

/// Proxy for a QUEUE binding hosted by a bridge.
#[derive(Debug, Clone)]
pub struct QueueClient {
    dispatcher: Dispatcher,
}

impl QueueClient {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn send(&self, body: impl Into<Value>, options: SendOptions) -> Result<(), BridgeError> {
        let params = [body.into(), options.to_value()];
        self.dispatcher.unit("send", &params, None).await
    }

    pub async fn send_batch(
        &self,
        messages: Vec<QueueMessage>,
        options: BatchOptions,
    ) -> Result<(), BridgeError> {
        let params = [messages.to_value(), options.to_value()];
        self.dispatcher.unit("sendBatch", &params, None).await
    }
}
