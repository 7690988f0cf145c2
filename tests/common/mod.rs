//! In-memory storage account used by the integration tests.
//!
//! Models idempotent creates, blob overwrite, entity key uniqueness, file
//! sizes, and queue visibility with pop receipts.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use storage_tour::blob::BlobStore;
use storage_tour::queue::{QueueMessage, QueueStore};
use storage_tour::runner::{RunSettings, StorageClients, StorageRunner};
use storage_tour::share::FileShareStore;
use storage_tour::table::{EntityStream, TableEntity, TableStore};
use storage_tour::{Result, StorageTourError};

#[derive(Debug, Clone)]
struct StoredMessage {
    id: String,
    text: String,
    receipt: Option<String>,
    dequeue_count: u64,
}

#[derive(Debug, Default)]
struct State {
    containers: HashMap<String, HashMap<String, Vec<u8>>>,
    tables: HashMap<String, BTreeMap<(String, String), TableEntity>>,
    shares: HashMap<String, HashMap<String, Vec<u8>>>,
    queues: HashMap<String, Vec<StoredMessage>>,
    calls: Vec<String>,
    fail_on: Option<String>,
    next_id: u64,
}

/// One fake storage account shared by all four collaborators
#[derive(Debug, Clone, Default)]
pub struct MemoryAccount {
    state: Arc<Mutex<State>>,
}

impl MemoryAccount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named operation fail with an authentication error
    pub fn fail_on(&self, operation: &str) {
        self.state.lock().unwrap().fail_on = Some(operation.to_string());
    }

    /// Operation names in call order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clients(&self) -> StorageClients {
        StorageClients {
            blob: Arc::new(self.clone()),
            table: Arc::new(self.clone()),
            share: Arc::new(self.clone()),
            queue: Arc::new(self.clone()),
        }
    }

    pub fn container_count(&self) -> usize {
        self.state.lock().unwrap().containers.len()
    }

    pub fn table_count(&self) -> usize {
        self.state.lock().unwrap().tables.len()
    }

    pub fn share_count(&self) -> usize {
        self.state.lock().unwrap().shares.len()
    }

    pub fn queue_count(&self) -> usize {
        self.state.lock().unwrap().queues.len()
    }

    pub fn blob(&self, container: &str, blob: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.containers.get(container)?.get(blob).cloned()
    }

    pub fn file(&self, share: &str, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.shares.get(share)?.get(path).cloned()
    }

    /// Texts of every message still in the queue, visible or not
    pub fn queued_texts(&self, queue: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .queues
            .get(queue)
            .map(|messages| messages.iter().map(|m| m.text.clone()).collect())
            .unwrap_or_default()
    }

    /// Let every received-but-undeleted message become visible again
    pub fn expire_visibility(&self, queue: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(messages) = state.queues.get_mut(queue) {
            for message in messages {
                message.receipt = None;
            }
        }
    }

    fn enter(&self, operation: &str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());
        if state.fail_on.as_deref() == Some(operation) {
            return Err(StorageTourError::service(
                403,
                "AuthenticationFailed",
                "Server failed to authenticate the request.",
            ));
        }
        Ok(state)
    }
}

fn not_found(code: &str) -> StorageTourError {
    StorageTourError::service(404, code, "The specified resource does not exist.")
}

#[async_trait]
impl BlobStore for MemoryAccount {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<()> {
        let mut state = self.enter("create_container")?;
        state.containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn upload_blob(&self, container: &str, blob: &str, content: Vec<u8>) -> Result<()> {
        let mut state = self.enter("upload_blob")?;
        let blobs = state
            .containers
            .get_mut(container)
            .ok_or_else(|| not_found("ContainerNotFound"))?;
        blobs.insert(blob.to_string(), content);
        Ok(())
    }

    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        let state = self.enter("download_blob")?;
        state
            .containers
            .get(container)
            .and_then(|blobs| blobs.get(blob))
            .cloned()
            .ok_or_else(|| not_found("BlobNotFound"))
    }
}

#[async_trait]
impl TableStore for MemoryAccount {
    async fn create_table_if_not_exists(&self, table: &str) -> Result<()> {
        let mut state = self.enter("create_table")?;
        state.tables.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn insert_entity(&self, table: &str, entity: &TableEntity) -> Result<()> {
        let mut state = self.enter("insert_entity")?;
        let rows = state
            .tables
            .get_mut(table)
            .ok_or_else(|| not_found("TableNotFound"))?;
        let key = (entity.partition_key.clone(), entity.row_key.clone());
        if rows.contains_key(&key) {
            return Err(StorageTourError::service(
                409,
                "EntityAlreadyExists",
                "The specified entity already exists.",
            ));
        }
        rows.insert(key, entity.clone());
        Ok(())
    }

    fn query_entities(&self, table: &str) -> EntityStream {
        let rows = match self.enter("query_entities") {
            Ok(state) => match state.tables.get(table) {
                Some(rows) => rows.values().cloned().map(Ok).collect::<Vec<_>>(),
                None => vec![Err(not_found("TableNotFound"))],
            },
            Err(e) => vec![Err(e)],
        };
        stream::iter(rows).boxed()
    }
}

#[async_trait]
impl FileShareStore for MemoryAccount {
    async fn create_share_if_not_exists(&self, share: &str) -> Result<()> {
        let mut state = self.enter("create_share")?;
        state.shares.entry(share.to_string()).or_default();
        Ok(())
    }

    async fn create_file(&self, share: &str, path: &str, size: u64) -> Result<()> {
        let mut state = self.enter("create_file")?;
        let files = state
            .shares
            .get_mut(share)
            .ok_or_else(|| not_found("ShareNotFound"))?;
        files.insert(path.to_string(), vec![0; size as usize]);
        Ok(())
    }

    async fn upload_file(&self, share: &str, path: &str, content: Vec<u8>) -> Result<()> {
        let mut state = self.enter("upload_file")?;
        let file = state
            .shares
            .get_mut(share)
            .and_then(|files| files.get_mut(path))
            .ok_or_else(|| not_found("ResourceNotFound"))?;
        if content.len() > file.len() {
            return Err(StorageTourError::service(
                416,
                "InvalidRange",
                "The range specified is invalid for the current size of the resource.",
            ));
        }
        file[..content.len()].copy_from_slice(&content);
        Ok(())
    }

    async fn download_file(&self, share: &str, path: &str) -> Result<Vec<u8>> {
        let state = self.enter("download_file")?;
        state
            .shares
            .get(share)
            .and_then(|files| files.get(path))
            .cloned()
            .ok_or_else(|| not_found("ResourceNotFound"))
    }
}

#[async_trait]
impl QueueStore for MemoryAccount {
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<()> {
        let mut state = self.enter("create_queue")?;
        state.queues.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn send_message(&self, queue: &str, text: &str) -> Result<()> {
        let mut state = self.enter("send_message")?;
        state.next_id += 1;
        let id = format!("msg-{}", state.next_id);
        let messages = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| not_found("QueueNotFound"))?;
        messages.push(StoredMessage {
            id,
            text: text.to_string(),
            receipt: None,
            dequeue_count: 0,
        });
        Ok(())
    }

    async fn receive_messages(&self, queue: &str, max_messages: u8) -> Result<Vec<QueueMessage>> {
        let mut state = self.enter("receive_messages")?;
        state.next_id += 1;
        let lease = state.next_id;
        let messages = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| not_found("QueueNotFound"))?;

        let received = messages
            .iter_mut()
            .filter(|m| m.receipt.is_none())
            .take(max_messages as usize)
            .map(|m| {
                let receipt = format!("{}-lease-{lease}", m.id);
                m.receipt = Some(receipt.clone());
                m.dequeue_count += 1;
                QueueMessage {
                    message_id: m.id.clone(),
                    pop_receipt: receipt,
                    text: m.text.clone(),
                    dequeue_count: m.dequeue_count,
                }
            })
            .collect();
        Ok(received)
    }

    async fn delete_message(&self, queue: &str, message_id: &str, pop_receipt: &str) -> Result<()> {
        let mut state = self.enter("delete_message")?;
        let messages = state
            .queues
            .get_mut(queue)
            .ok_or_else(|| not_found("QueueNotFound"))?;
        let position = messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| not_found("MessageNotFound"))?;
        if messages[position].receipt.as_deref() != Some(pop_receipt) {
            return Err(StorageTourError::service(
                400,
                "PopReceiptMismatch",
                "The specified pop receipt did not match the pop receipt for a dequeued message.",
            ));
        }
        messages.remove(position);
        Ok(())
    }
}

/// Settings with local files placed in `dir` and sample content written
pub fn settings_in(dir: &Path, content: &[u8]) -> RunSettings {
    let mut settings = RunSettings::from(&storage_tour::config::Config::default());
    settings.local_file = dir.join("sample.txt");
    settings.download_file = dir.join("downloaded-sample.txt");
    std::fs::write(&settings.local_file, content).unwrap();
    settings
}

pub fn runner_for(account: &MemoryAccount, settings: RunSettings) -> StorageRunner {
    StorageRunner::new(account.clients(), settings)
}
