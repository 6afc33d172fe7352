use super::persistence::{StoreSnapshot, read_snapshot, write_snapshot};
use super::{RecordStream, StoreClient, StoreConnector};
use crate::connection::config::EndpointConfig;
use crate::core::{DriverError, KeyedRecord, Record, Result};
use crate::schema::Table;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Reference key-value store living in process memory.
///
/// Stands in for one remote table server. Optional per-call latency simulates
/// a network round-trip, and the store can be switched offline to exercise
/// `StoreUnavailable` paths.
pub struct InMemoryStore {
    endpoint: String,
    records: RwLock<BTreeMap<String, Record>>,
    native_indexes: RwLock<BTreeSet<String>>,
    snapshot_path: Option<PathBuf>,
    latency: Option<Duration>,
    available: AtomicBool,
    operations: AtomicU64,
    syncs: AtomicU64,
}

impl InMemoryStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            records: RwLock::new(BTreeMap::new()),
            native_indexes: RwLock::new(BTreeSet::new()),
            snapshot_path: None,
            latency: None,
            available: AtomicBool::new(true),
            operations: AtomicU64::new(0),
            syncs: AtomicU64::new(0),
        }
    }

    /// Delays every call by `latency` before touching the data.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Opens a persistent store, reloading the last synced snapshot at `path`.
    pub fn open_persistent(endpoint: impl Into<String>, path: PathBuf) -> Result<Self> {
        let mut store = Self::new(endpoint);
        if let Some(snapshot) = read_snapshot(&path)? {
            store.records = RwLock::new(snapshot.records);
        }
        store.snapshot_path = Some(path);
        Ok(store)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn operation_count(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    pub fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn native_indexes(&self) -> Vec<String> {
        self.native_indexes.read().await.iter().cloned().collect()
    }

    async fn round_trip(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(DriverError::StoreUnavailable(format!(
                "{} is offline",
                self.endpoint
            )));
        }
        self.operations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Record>> {
        self.round_trip().await?;
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Record) -> Result<()> {
        self.round_trip().await?;
        self.records.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.round_trip().await?;
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<RecordStream> {
        self.round_trip().await?;
        let matches = {
            let records = self.records.read().await;
            records
                .range(prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, record)| Ok(KeyedRecord::new(key.clone(), record.clone())))
                .collect::<Vec<_>>()
        };
        Ok(stream::iter(matches).boxed())
    }

    async fn sync(&self) -> Result<()> {
        self.round_trip().await?;
        self.syncs.fetch_add(1, Ordering::Relaxed);
        if let Some(path) = &self.snapshot_path {
            let snapshot = StoreSnapshot::new(&self.endpoint, self.records.read().await.clone());
            write_snapshot(path, &snapshot)?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.round_trip().await?;
        self.records.write().await.clear();
        self.native_indexes.write().await.clear();
        Ok(())
    }

    async fn create_index(&self, column: &str) -> Result<()> {
        self.round_trip().await?;
        self.native_indexes.write().await.insert(column.to_string());
        Ok(())
    }

    async fn optimize_index(&self, column: &str) -> Result<()> {
        self.round_trip().await?;
        if !self.native_indexes.read().await.contains(column) {
            return Err(DriverError::Config(format!(
                "{} has no index on '{}' to optimize",
                self.endpoint, column
            )));
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}

/// Opens an [`InMemoryStore`] per configured endpoint.
///
/// Persistent endpoints keep a snapshot under `data_dir/shard-<id>/<TABLE>.json`
/// when a data directory is set.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    data_dir: Option<PathBuf>,
    latency: Option<Duration>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(
        &self,
        shard_id: u32,
        table: Table,
        endpoint: &EndpointConfig,
    ) -> Result<Arc<dyn StoreClient>> {
        let address = format!("{}:{}/{}", endpoint.host, endpoint.port, table);
        let store = match (&self.data_dir, endpoint.persistent) {
            (Some(dir), true) => {
                let path = dir
                    .join(format!("shard-{}", shard_id))
                    .join(format!("{}.json", table));
                InMemoryStore::open_persistent(address, path)?
            }
            _ => InMemoryStore::new(address),
        };
        let store = match self.latency {
            Some(latency) => store.with_latency(latency),
            None => store,
        };
        Ok(Arc::new(store))
    }
}
