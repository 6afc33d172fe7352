pub mod memory;
pub mod persistence;

use crate::connection::config::EndpointConfig;
use crate::core::{KeyedRecord, Record, Result};
use crate::schema::Table;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

pub use memory::{InMemoryConnector, InMemoryStore};

/// Rows produced by a prefix scan. Finite, not restartable once consumed.
pub type RecordStream = BoxStream<'static, Result<KeyedRecord>>;

/// Narrow client for one table on one shard of the key-value store.
///
/// Every call may fail with `DriverError::StoreUnavailable`. Single-key calls
/// are assumed atomic at the store; nothing spans keys.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Returns the record stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Record>>;

    /// Upserts `value` under `key`.
    async fn put(&self, key: &str, value: Record) -> Result<()>;

    /// Removes `key`. Removing an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Streams every record whose key starts with `prefix`, in no guaranteed order.
    async fn scan_prefix(&self, prefix: &str) -> Result<RecordStream>;

    /// Flushes to durable storage.
    async fn sync(&self) -> Result<()>;

    /// Removes every record.
    async fn clear(&self) -> Result<()>;

    /// Asks the store to index `column` natively. No-op when unsupported.
    async fn create_index(&self, _column: &str) -> Result<()> {
        Ok(())
    }

    /// Asks the store to optimize a native index. No-op when unsupported.
    async fn optimize_index(&self, _column: &str) -> Result<()> {
        Ok(())
    }

    /// Human-readable address used in logs and errors.
    fn endpoint(&self) -> String;
}

/// Opens store clients for configured endpoints.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        shard_id: u32,
        table: Table,
        endpoint: &EndpointConfig,
    ) -> Result<Arc<dyn StoreClient>>;
}
