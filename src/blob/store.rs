use crate::error::Result;
use async_trait::async_trait;

/// Blob sub-API of a storage account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the container unless it already exists
    async fn create_container_if_not_exists(&self, container: &str) -> Result<()>;

    /// Upload `content` as a block blob, replacing any existing blob of that name
    async fn upload_blob(&self, container: &str, blob: &str, content: Vec<u8>) -> Result<()>;

    /// Download the full content of a blob
    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>>;
}
