use crate::error::Result;
use crate::table::models::TableEntity;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazily fetched query results; pages are requested as the stream is polled
pub type EntityStream = BoxStream<'static, Result<TableEntity>>;

/// Table sub-API of a storage account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create the table unless it already exists
    async fn create_table_if_not_exists(&self, table: &str) -> Result<()>;

    /// Insert a new entity; fails if the (partition key, row key) pair exists
    async fn insert_entity(&self, table: &str, entity: &TableEntity) -> Result<()>;

    /// Query every entity in the table. Call again to restart from the beginning.
    fn query_entities(&self, table: &str) -> EntityStream;
}
