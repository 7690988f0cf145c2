//! Azure Queue Storage operations
//!
//! Queue creation, sending text messages, and receive/delete with pop receipts.

pub mod manager;
pub mod models;
pub mod store;

pub use manager::QueueManager;
pub use models::QueueMessage;
pub use store::QueueStore;
#[cfg(test)]
pub use store::MockQueueStore;
