use crate::error::Result;
use crate::queue::models::QueueMessage;
use async_trait::async_trait;

/// Queue sub-API of a storage account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Create the queue unless it already exists
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<()>;

    async fn send_message(&self, queue: &str, text: &str) -> Result<()>;

    /// Receive up to `max_messages` visible messages, hiding them for the
    /// service's visibility timeout
    async fn receive_messages(&self, queue: &str, max_messages: u8) -> Result<Vec<QueueMessage>>;

    async fn delete_message(&self, queue: &str, message_id: &str, pop_receipt: &str) -> Result<()>;
}
