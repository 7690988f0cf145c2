use crate::error::Result;
use async_trait::async_trait;

/// File share sub-API of a storage account
///
/// Paths are relative to the share's root directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileShareStore: Send + Sync {
    /// Create the share unless it already exists
    async fn create_share_if_not_exists(&self, share: &str) -> Result<()>;

    /// Create (or reset) a file of `size` bytes, zero-filled
    async fn create_file(&self, share: &str, path: &str, size: u64) -> Result<()>;

    /// Write `content` into a file previously created with at least that size
    async fn upload_file(&self, share: &str, path: &str, content: Vec<u8>) -> Result<()>;

    async fn download_file(&self, share: &str, path: &str) -> Result<Vec<u8>>;
}
