//! Storage operations runner
//!
//! Executes the Blob, Table, File Share and Queue groups against their
//! collaborators in a fixed order, writing one status line per group to the
//! console. The first failing call aborts the run; later groups never start.

use crate::auth::StorageAccount;
use crate::blob::{BlobManager, BlobStore};
use crate::config::Config;
use crate::error::{Result, StorageTourError};
use crate::queue::{QueueManager, QueueMessage, QueueStore};
use crate::share::{FileShareStore, ShareManager};
use crate::table::{EntityStream, TableEntity, TableManager, TableStore};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const BLOB_DONE: &str = "Blob uploaded and downloaded successfully.";
pub const TABLE_DONE: &str = "Table created, data inserted and queried successfully.";
pub const SHARE_DONE: &str = "File uploaded and downloaded from file share successfully.";
pub const QUEUE_DONE: &str = "Messages added and read from queue successfully.";

/// Content written by `--seed` when the local source file is missing
pub const SAMPLE_CONTENT: &str = "Hello from storage-tour!\nThis file travels through blob and file share storage.\n";

/// One operation group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Blob,
    Table,
    Share,
    Queue,
}

impl Group {
    /// Every group in execution order
    pub const ALL: [Group; 4] = [Group::Blob, Group::Table, Group::Share, Group::Queue];
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Group::Blob => "blob",
            Group::Table => "table",
            Group::Share => "file share",
            Group::Queue => "queue",
        };
        f.write_str(name)
    }
}

/// One collaborator per storage sub-API
#[derive(Clone)]
pub struct StorageClients {
    pub blob: Arc<dyn BlobStore>,
    pub table: Arc<dyn TableStore>,
    pub share: Arc<dyn FileShareStore>,
    pub queue: Arc<dyn QueueStore>,
}

impl StorageClients {
    /// Azure-backed collaborators for every service the account exposes
    ///
    /// A service whose endpoint cannot be resolved fails only when its group runs.
    pub fn from_account(account: &StorageAccount) -> Self {
        Self {
            blob: BlobManager::new(account)
                .map(|m| Arc::new(m) as Arc<dyn BlobStore>)
                .unwrap_or_else(|e| Arc::new(Unavailable::from(e)) as Arc<dyn BlobStore>),
            table: TableManager::new(account)
                .map(|m| Arc::new(m) as Arc<dyn TableStore>)
                .unwrap_or_else(|e| Arc::new(Unavailable::from(e)) as Arc<dyn TableStore>),
            share: ShareManager::new(account)
                .map(|m| Arc::new(m) as Arc<dyn FileShareStore>)
                .unwrap_or_else(|e| Arc::new(Unavailable::from(e)) as Arc<dyn FileShareStore>),
            queue: QueueManager::new(account)
                .map(|m| Arc::new(m) as Arc<dyn QueueStore>)
                .unwrap_or_else(|e| Arc::new(Unavailable::from(e)) as Arc<dyn QueueStore>),
        }
    }
}

/// Stand-in for a service the connection string cannot reach
#[derive(Debug, Clone)]
struct Unavailable {
    reason: String,
}

impl From<StorageTourError> for Unavailable {
    fn from(error: StorageTourError) -> Self {
        let reason = match error {
            StorageTourError::ConfigError(msg) => msg,
            other => other.to_string(),
        };
        Self { reason }
    }
}

impl Unavailable {
    fn fail<T>(&self) -> Result<T> {
        Err(StorageTourError::config(self.reason.clone()))
    }
}

#[async_trait]
impl BlobStore for Unavailable {
    async fn create_container_if_not_exists(&self, _container: &str) -> Result<()> {
        self.fail()
    }

    async fn upload_blob(&self, _container: &str, _blob: &str, _content: Vec<u8>) -> Result<()> {
        self.fail()
    }

    async fn download_blob(&self, _container: &str, _blob: &str) -> Result<Vec<u8>> {
        self.fail()
    }
}

#[async_trait]
impl TableStore for Unavailable {
    async fn create_table_if_not_exists(&self, _table: &str) -> Result<()> {
        self.fail()
    }

    async fn insert_entity(&self, _table: &str, _entity: &TableEntity) -> Result<()> {
        self.fail()
    }

    fn query_entities(&self, _table: &str) -> EntityStream {
        let error = StorageTourError::config(self.reason.clone());
        stream::once(async move { Err(error) }).boxed()
    }
}

#[async_trait]
impl FileShareStore for Unavailable {
    async fn create_share_if_not_exists(&self, _share: &str) -> Result<()> {
        self.fail()
    }

    async fn create_file(&self, _share: &str, _path: &str, _size: u64) -> Result<()> {
        self.fail()
    }

    async fn upload_file(&self, _share: &str, _path: &str, _content: Vec<u8>) -> Result<()> {
        self.fail()
    }

    async fn download_file(&self, _share: &str, _path: &str) -> Result<Vec<u8>> {
        self.fail()
    }
}

#[async_trait]
impl QueueStore for Unavailable {
    async fn create_queue_if_not_exists(&self, _queue: &str) -> Result<()> {
        self.fail()
    }

    async fn send_message(&self, _queue: &str, _text: &str) -> Result<()> {
        self.fail()
    }

    async fn receive_messages(&self, _queue: &str, _max_messages: u8) -> Result<Vec<QueueMessage>> {
        self.fail()
    }

    async fn delete_message(&self, _queue: &str, _message_id: &str, _pop_receipt: &str) -> Result<()> {
        self.fail()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobReport {
    pub container: String,
    pub blob: String,
    pub uploaded_bytes: u64,
    pub download_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub table: String,
    pub inserted: TableEntity,
    pub rows: Vec<TableEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReport {
    pub share: String,
    pub file: String,
    pub declared_size: u64,
    pub download_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueReport {
    pub queue: String,
    pub sent: Vec<String>,
    pub received: Vec<QueueMessage>,
}

/// Reports of the groups that ran, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub blob: Option<BlobReport>,
    pub table: Option<TableReport>,
    pub share: Option<ShareReport>,
    pub queue: Option<QueueReport>,
}

/// Names and paths the groups operate on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub local_file: PathBuf,
    pub download_file: PathBuf,
    pub container_name: String,
    pub blob_name: String,
    pub table_name: String,
    pub partition_key: String,
    pub row_key: String,
    pub properties: BTreeMap<String, String>,
    pub share_name: String,
    pub file_name: String,
    pub queue_name: String,
    pub messages: Vec<String>,
    pub max_messages: u8,
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            local_file: config.local_file.clone(),
            download_file: config.download_file.clone(),
            container_name: config.container_name.clone(),
            blob_name: config.blob_name.clone(),
            table_name: config.table_name.clone(),
            partition_key: config.partition_key.clone(),
            row_key: config.row_key.clone(),
            properties: config.properties.clone(),
            share_name: config.share_name.clone(),
            file_name: config.file_name.clone(),
            queue_name: config.queue_name.clone(),
            messages: config.messages.clone(),
            max_messages: config.max_messages,
        }
    }
}

/// Runs the operation groups against one storage account
pub struct StorageRunner {
    clients: StorageClients,
    settings: RunSettings,
}

impl StorageRunner {
    pub fn new(clients: StorageClients, settings: RunSettings) -> Self {
        Self { clients, settings }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run every group in order
    pub async fn run_all<W: Write + Send>(&self, out: &mut W) -> Result<RunReport> {
        self.run_groups(&Group::ALL, out).await
    }

    /// Run the selected groups one after another, stopping at the first error.
    ///
    /// Groups always run in the fixed Blob, Table, Share, Queue order,
    /// whatever order `groups` lists them in.
    pub async fn run_groups<W: Write + Send>(&self, groups: &[Group], out: &mut W) -> Result<RunReport> {
        let mut report = RunReport::default();

        for group in Group::ALL.iter().filter(|g| groups.contains(*g)) {
            info!("Starting {} operations", group);
            match group {
                Group::Blob => report.blob = Some(self.run_blob(out).await?),
                Group::Table => report.table = Some(self.run_table(out).await?),
                Group::Share => report.share = Some(self.run_share(out).await?),
                Group::Queue => report.queue = Some(self.run_queue(out).await?),
            }
            info!("Finished {} operations", group);
        }

        Ok(report)
    }

    /// Ensure the container, upload the local file over any existing blob, download it back
    pub async fn run_blob<W: Write + Send>(&self, out: &mut W) -> Result<BlobReport> {
        let s = &self.settings;
        let blob = &self.clients.blob;

        blob.create_container_if_not_exists(&s.container_name).await?;

        let content = read_local(&s.local_file).await?;
        let uploaded_bytes = content.len() as u64;
        blob.upload_blob(&s.container_name, &s.blob_name, content).await?;

        let downloaded = blob.download_blob(&s.container_name, &s.blob_name).await?;
        write_local(&s.download_file, &downloaded).await?;

        writeln!(out, "{BLOB_DONE}")?;

        Ok(BlobReport {
            container: s.container_name.clone(),
            blob: s.blob_name.clone(),
            uploaded_bytes,
            download_path: s.download_file.clone(),
        })
    }

    /// Ensure the table, insert one entity, then print every row the query yields
    pub async fn run_table<W: Write + Send>(&self, out: &mut W) -> Result<TableReport> {
        let s = &self.settings;
        let table = &self.clients.table;

        table.create_table_if_not_exists(&s.table_name).await?;

        let entity = s
            .properties
            .iter()
            .fold(TableEntity::new(&s.partition_key, &s.row_key), |entity, (name, value)| {
                entity.with_property(name, value.as_str())
            });
        table.insert_entity(&s.table_name, &entity).await?;

        let mut rows = Vec::new();
        let mut results = table.query_entities(&s.table_name);
        while let Some(row) = results.try_next().await? {
            let values = s
                .properties
                .keys()
                .map(|name| row.property_display(name))
                .collect::<Vec<_>>();
            writeln!(out, "{}: {}", row.row_key, values.join(", "))?;
            rows.push(row);
        }
        debug!("Query returned {} row(s)", rows.len());

        writeln!(out, "{TABLE_DONE}")?;

        Ok(TableReport {
            table: s.table_name.clone(),
            inserted: entity,
            rows,
        })
    }

    /// Ensure the share, create a file sized to the local file, upload, download
    pub async fn run_share<W: Write + Send>(&self, out: &mut W) -> Result<ShareReport> {
        let s = &self.settings;
        let share = &self.clients.share;

        share.create_share_if_not_exists(&s.share_name).await?;

        let content = read_local(&s.local_file).await?;
        let declared_size = content.len() as u64;
        share.create_file(&s.share_name, &s.file_name, declared_size).await?;
        share.upload_file(&s.share_name, &s.file_name, content).await?;

        let downloaded = share.download_file(&s.share_name, &s.file_name).await?;
        write_local(&s.download_file, &downloaded).await?;

        writeln!(out, "{SHARE_DONE}")?;

        Ok(ShareReport {
            share: s.share_name.clone(),
            file: s.file_name.clone(),
            declared_size,
            download_path: s.download_file.clone(),
        })
    }

    /// Ensure the queue, send the messages in order, receive one batch and
    /// delete each received message with its own pop receipt
    pub async fn run_queue<W: Write + Send>(&self, out: &mut W) -> Result<QueueReport> {
        let s = &self.settings;
        let queue = &self.clients.queue;

        queue.create_queue_if_not_exists(&s.queue_name).await?;

        for text in &s.messages {
            queue.send_message(&s.queue_name, text).await?;
        }

        // One receive call; anything not returned stays queued
        let received = queue.receive_messages(&s.queue_name, s.max_messages).await?;
        for message in &received {
            writeln!(out, "Message: {}", message.text)?;
            queue
                .delete_message(&s.queue_name, &message.message_id, &message.pop_receipt)
                .await?;
        }

        writeln!(out, "{QUEUE_DONE}")?;

        Ok(QueueReport {
            queue: s.queue_name.clone(),
            sent: s.messages.clone(),
            received,
        })
    }
}

/// Create the local source file with sample content unless it exists
pub async fn seed_local_file(path: &Path) -> Result<bool> {
    if tokio::fs::try_exists(path)
        .await
        .map_err(|e| StorageTourError::local_file(path, e))?
    {
        return Ok(false);
    }

    write_local(path, SAMPLE_CONTENT.as_bytes()).await?;
    info!("Created sample file {}", path.display());
    Ok(true)
}

async fn read_local(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| StorageTourError::local_file(path, e))
}

async fn write_local(path: &Path, content: &[u8]) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| StorageTourError::local_file(path, e))
}
