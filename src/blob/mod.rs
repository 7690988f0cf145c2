//! Azure Blob Storage operations
//!
//! This module provides the blob collaborator used by the runner:
//! idempotent container creation, overwriting upload and download.

pub mod manager;
pub mod store;

// Re-export commonly used types
pub use manager::BlobManager;
pub use store::BlobStore;
#[cfg(test)]
pub use store::MockBlobStore;
