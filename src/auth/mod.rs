//! Authentication module for Azure Storage
//!
//! This module turns a storage connection string into an account
//! description and signs hand-built REST requests with the account key.

pub mod connection;
pub mod shared_key;

pub use connection::*;
