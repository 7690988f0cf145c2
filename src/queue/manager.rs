//! Queue storage manager backed by the Azure SDK

use crate::auth::{StorageAccount, StorageService};
use crate::error::{is_already_exists, Result, StorageTourError};
use crate::queue::models::QueueMessage;
use crate::queue::store::QueueStore;
use async_trait::async_trait;
use azure_storage_queues::prelude::*;
use azure_storage_queues::{NumberOfMessages, PopReceipt, QueueServiceClientBuilder};
use tracing::{debug, warn};

/// Queue collaborator talking to a real storage account
#[derive(Clone)]
pub struct QueueManager {
    service: QueueServiceClient,
}

impl QueueManager {
    pub fn new(account: &StorageAccount) -> Result<Self> {
        let location = account.cloud_location(StorageService::Queue)?;
        let credentials = account.storage_credentials();
        let service = QueueServiceClientBuilder::with_location(location, credentials).build();

        Ok(Self { service })
    }
}

#[async_trait]
impl QueueStore for QueueManager {
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<()> {
        debug!("Creating queue '{}'", queue);

        // An existing queue with matching metadata answers 204; a mismatch answers 409
        match self.service.queue_client(queue).create().await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                warn!("Queue '{}' already exists", queue);
                Ok(())
            }
            Err(e) => Err(StorageTourError::azure_api(format!(
                "Failed to create queue '{queue}': {e}"
            ))),
        }
    }

    async fn send_message(&self, queue: &str, text: &str) -> Result<()> {
        debug!("Sending message to '{}'", queue);

        self.service
            .queue_client(queue)
            .put_message(text)
            .await
            .map_err(|e| StorageTourError::azure_api(format!("Failed to send message to '{queue}': {e}")))?;

        Ok(())
    }

    async fn receive_messages(&self, queue: &str, max_messages: u8) -> Result<Vec<QueueMessage>> {
        debug!("Receiving up to {} messages from '{}'", max_messages, queue);

        let response = self
            .service
            .queue_client(queue)
            .get_messages()
            .number_of_messages(NumberOfMessages::new(max_messages))
            .await
            .map_err(|e| {
                StorageTourError::azure_api(format!("Failed to receive messages from '{queue}': {e}"))
            })?;

        Ok(response
            .messages
            .into_iter()
            .map(|message| QueueMessage {
                message_id: message.message_id,
                pop_receipt: message.pop_receipt,
                text: message.message_text,
                dequeue_count: message.dequeue_count,
            })
            .collect())
    }

    async fn delete_message(&self, queue: &str, message_id: &str, pop_receipt: &str) -> Result<()> {
        debug!("Deleting message {} from '{}'", message_id, queue);

        self.service
            .queue_client(queue)
            .pop_receipt_client(PopReceipt::new(message_id, pop_receipt))
            .delete()
            .await
            .map_err(|e| {
                StorageTourError::azure_api(format!(
                    "Failed to delete message {message_id} from '{queue}': {e}"
                ))
            })?;

        Ok(())
    }
}
