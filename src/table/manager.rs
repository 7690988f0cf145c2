//! Table storage manager backed by the Azure SDK

use crate::auth::{StorageAccount, StorageService};
use crate::error::{is_already_exists, Result, StorageTourError};
use crate::table::models::TableEntity;
use crate::table::store::{EntityStream, TableStore};
use async_trait::async_trait;
use azure_data_tables::prelude::*;
use azure_data_tables::clients::TableServiceClientBuilder;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, warn};

/// Table collaborator talking to a real storage account
#[derive(Clone)]
pub struct TableManager {
    service: TableServiceClient,
}

impl TableManager {
    pub fn new(account: &StorageAccount) -> Result<Self> {
        let location = account.cloud_location(StorageService::Table)?;
        let credentials = account.storage_credentials();
        let service = TableServiceClientBuilder::with_location(location, credentials).build();

        Ok(Self { service })
    }
}

#[async_trait]
impl TableStore for TableManager {
    async fn create_table_if_not_exists(&self, table: &str) -> Result<()> {
        debug!("Creating table '{}'", table);

        match self.service.table_client(table).create().await {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                warn!("Table '{}' already exists", table);
                Ok(())
            }
            Err(e) => Err(StorageTourError::azure_api(format!(
                "Failed to create table '{table}': {e}"
            ))),
        }
    }

    async fn insert_entity(&self, table: &str, entity: &TableEntity) -> Result<()> {
        debug!(
            "Inserting entity ({}, {}) into '{}'",
            entity.partition_key, entity.row_key, table
        );

        self.service
            .table_client(table)
            .insert::<_, serde_json::Value>(entity)
            .map_err(|e| StorageTourError::serialization(format!("Failed to encode entity: {e}")))?
            .await
            .map_err(|e| {
                StorageTourError::azure_api(format!(
                    "Failed to insert entity ({}, {}) into '{table}': {e}",
                    entity.partition_key, entity.row_key
                ))
            })?;

        Ok(())
    }

    fn query_entities(&self, table: &str) -> EntityStream {
        debug!("Querying entities in '{}'", table);

        let table = table.to_string();
        self.service
            .table_client(table.clone())
            .query()
            .into_stream::<TableEntity>()
            .map_err(move |e| {
                StorageTourError::azure_api(format!("Failed to query table '{table}': {e}"))
            })
            .map_ok(|page| {
                stream::iter(
                    page.entities
                        .into_iter()
                        .map(|entity| Ok::<_, StorageTourError>(entity.without_system_properties())),
                )
            })
            .try_flatten()
            .boxed()
    }
}
