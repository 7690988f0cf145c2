//! storage-tour - Azure Storage walkthrough
//!
//! Exercises the Blob, Table, File Share and Queue services of one storage
//! account with a fixed sequence of create, upload, download, query, send
//! and receive operations.

pub mod auth;
pub mod blob;
pub mod cli;
pub mod config;
pub mod error;
pub mod queue;
pub mod runner;
pub mod share;
pub mod table;

// Re-export commonly used types
pub use error::{Result, StorageTourError};
pub use runner::{Group, RunReport, RunSettings, StorageClients, StorageRunner};
