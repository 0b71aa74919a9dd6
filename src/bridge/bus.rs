/*!
Messaging boundary.

`MessageBus` is the publish side of whatever pub/sub transport carries requests and
responses. `MemoryBus` keeps published messages in memory, for the CLI and for tests.
*/

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    pub retain: bool,
    pub qos: u8,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            retain: false,
            qos: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        payload: String,
        options: PublishOptions,
    ) -> Result<(), BusError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub options: PublishOptions,
}

#[derive(Debug, Default)]
pub struct MemoryBus {
    published: Mutex<Vec<Message>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<Message> {
        self.published.lock().await.clone()
    }

    /// Drains everything published so far.
    pub async fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.published.lock().await)
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(
        &self,
        topic: &str,
        payload: String,
        options: PublishOptions,
    ) -> Result<(), BusError> {
        self.published.lock().await.push(Message {
            topic: topic.to_string(),
            payload,
            options,
        });
        Ok(())
    }
}
