//! Azure Table Storage operations
//!
//! Table creation, entity insertion and lazily paged entity queries.

pub mod manager;
pub mod models;
pub mod store;

pub use manager::TableManager;
pub use models::TableEntity;
pub use store::{EntityStream, TableStore};
#[cfg(test)]
pub use store::MockTableStore;
