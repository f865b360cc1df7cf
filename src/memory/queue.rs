//! In-memory queue producer.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bindings::error::{BindingError, BindingResult};
use crate::bindings::queue::{Queue, QueueMessage};

/// Messages per `sendBatch` call.
pub const MAX_BATCH_MESSAGES: usize = 100;
/// Longest accepted delivery delay (12 hours).
pub const MAX_DELAY_SECONDS: u32 = 43_200;

/// Queue that records sent messages in order.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    messages: Arc<Mutex<Vec<QueueMessage>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    pub async fn messages(&self) -> Vec<QueueMessage> {
        self.messages.lock().await.clone()
    }

    /// Remove and return everything sent so far.
    pub async fn drain(&self) -> Vec<QueueMessage> {
        std::mem::take(&mut *self.messages.lock().await)
    }

    fn check(message: &QueueMessage) -> BindingResult<()> {
        message.validate()?;
        if let Some(delay) = message.delay_seconds {
            if delay > MAX_DELAY_SECONDS {
                return Err(BindingError::invalid_argument(format!(
                    "delaySeconds {delay} exceeds the maximum of {MAX_DELAY_SECONDS}"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn send(&self, message: QueueMessage) -> BindingResult<()> {
        Self::check(&message)?;
        self.messages.lock().await.push(message);
        Ok(())
    }

    async fn send_batch(&self, messages: Vec<QueueMessage>) -> BindingResult<()> {
        if messages.len() > MAX_BATCH_MESSAGES {
            return Err(BindingError::invalid_argument(format!(
                "batch of {} messages exceeds the maximum of {MAX_BATCH_MESSAGES}",
                messages.len()
            )));
        }
        // All or nothing.
        messages.iter().try_for_each(Self::check)?;
        self.messages.lock().await.extend(messages);
        Ok(())
    }
}
