//! Blob storage manager backed by the Azure SDK
//!
//! Wraps `azure_storage_blobs` clients for the container and blob calls
//! the runner needs.

use crate::auth::{StorageAccount, StorageService};
use crate::blob::store::BlobStore;
use crate::error::{is_already_exists, Result, StorageTourError};
use async_trait::async_trait;
use azure_storage_blobs::prelude::*;
use tracing::{debug, warn};

/// Blob collaborator talking to a real storage account
#[derive(Clone)]
pub struct BlobManager {
    service: BlobServiceClient,
}

impl BlobManager {
    /// Create a new BlobManager for the account's blob endpoint
    pub fn new(account: &StorageAccount) -> Result<Self> {
        let location = account.cloud_location(StorageService::Blob)?;
        let credentials = account.storage_credentials();
        let service = ClientBuilder::with_location(location, credentials).blob_service_client();

        Ok(Self { service })
    }
}

#[async_trait]
impl BlobStore for BlobManager {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<()> {
        debug!("Creating container '{}'", container);

        match self.service.container_client(container).create().await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                warn!("Container '{}' already exists", container);
                Ok(())
            }
            Err(e) => Err(StorageTourError::azure_api(format!(
                "Failed to create container '{container}': {e}"
            ))),
        }
    }

    async fn upload_blob(&self, container: &str, blob: &str, content: Vec<u8>) -> Result<()> {
        debug!("Uploading {} bytes to {}/{}", content.len(), container, blob);

        // Put Blob replaces an existing block blob unconditionally
        self.service
            .container_client(container)
            .blob_client(blob)
            .put_block_blob(content)
            .await
            .map_err(|e| StorageTourError::azure_api(format!("Failed to upload blob '{blob}': {e}")))?;

        Ok(())
    }

    async fn download_blob(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        debug!("Downloading {}/{}", container, blob);

        let content = self
            .service
            .container_client(container)
            .blob_client(blob)
            .get_content()
            .await
            .map_err(|e| StorageTourError::azure_api(format!("Failed to download blob '{blob}': {e}")))?;

        Ok(content)
    }
}
