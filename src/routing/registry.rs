use super::ShardRouter;
use crate::connection::config::{DriverConfig, ShardMapping};
use crate::core::{DriverError, Result};
use crate::schema::Table;
use crate::store::{StoreClient, StoreConnector};
use crate::view::{RelationalView, SecondaryIndex};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{Level, event};

/// One shard: a client per table plus the shard-local secondary indexes.
pub struct Shard {
    id: u32,
    clients: HashMap<Table, Arc<dyn StoreClient>>,
    indexes: Arc<SecondaryIndex>,
}

impl Shard {
    pub fn new(id: u32, clients: HashMap<Table, Arc<dyn StoreClient>>) -> Self {
        Self {
            id,
            clients,
            indexes: Arc::new(SecondaryIndex::new()),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn client(&self, table: Table) -> Result<Arc<dyn StoreClient>> {
        self.clients
            .get(&table)
            .cloned()
            .ok_or_else(|| DriverError::UnknownShard {
                table: table.name().to_string(),
                shard: self.id,
            })
    }

    pub fn indexes(&self) -> &Arc<SecondaryIndex> {
        &self.indexes
    }
}

/// Process-wide set of shard connections.
///
/// Built once before the load phase and shared by reference with every
/// transaction; connections are never reopened mid-run.
pub struct ShardRegistry {
    router: ShardRouter,
    shards: BTreeMap<u32, Shard>,
}

impl ShardRegistry {
    /// Connects every configured endpoint, clearing all tables when `reset` is set.
    pub async fn connect(config: &DriverConfig, connector: &dyn StoreConnector) -> Result<Self> {
        config.validate()?;

        let mut shards = BTreeMap::new();
        for (shard_id, tables) in &config.servers {
            let mut clients = HashMap::new();
            for (table, endpoint) in tables {
                let client = connector.connect(*shard_id, *table, endpoint).await?;
                event!(
                    Level::DEBUG,
                    shard = shard_id,
                    table = %table,
                    endpoint = %client.endpoint(),
                    "connected table server"
                );
                clients.insert(*table, client);
            }
            shards.insert(*shard_id, Shard::new(*shard_id, clients));
        }

        let registry = Self::from_shards(config.shard_mapping, shards)?;
        if config.reset {
            registry.clear_all().await?;
        }
        event!(
            Level::INFO,
            shards = registry.shards.len(),
            reset = config.reset,
            "shard registry ready"
        );
        Ok(registry)
    }

    pub fn from_shards(mapping: ShardMapping, shards: BTreeMap<u32, Shard>) -> Result<Self> {
        let router = ShardRouter::new(mapping, shards.keys().copied())?;
        Ok(Self { router, shards })
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    pub fn shard(&self, shard_id: u32) -> Result<&Shard> {
        self.shards
            .get(&shard_id)
            .ok_or_else(|| DriverError::UnknownShard {
                table: "*".to_string(),
                shard: shard_id,
            })
    }

    pub fn shards(&self) -> impl Iterator<Item = &Shard> {
        self.shards.values()
    }

    pub fn client(&self, shard_id: u32, table: Table) -> Result<Arc<dyn StoreClient>> {
        self.shard(shard_id)?.client(table)
    }

    /// View of `table` on the shard owning `warehouse_id`.
    ///
    /// Replicated tables are read from the warehouse's own shard.
    pub fn view(&self, table: Table, warehouse_id: i64) -> Result<RelationalView> {
        let shard_id = self.router.route(table, warehouse_id)?;
        self.view_on(table, shard_id)
    }

    pub fn view_on(&self, table: Table, shard_id: u32) -> Result<RelationalView> {
        let shard = self.shard(shard_id)?;
        Ok(RelationalView::new(
            table,
            shard_id,
            shard.client(table)?,
            Arc::clone(shard.indexes()),
        ))
    }

    /// Clears every table on every shard along with the in-memory indexes.
    pub async fn clear_all(&self) -> Result<()> {
        for shard in self.shards.values() {
            for table in Table::ALL {
                event!(Level::DEBUG, shard = shard.id, table = %table, "clearing table");
                shard.client(table)?.clear().await?;
            }
            shard.indexes.clear().await;
        }
        Ok(())
    }

    pub async fn sync_all(&self) -> Result<()> {
        for shard in self.shards.values() {
            for table in Table::ALL {
                shard.client(table)?.sync().await?;
            }
        }
        Ok(())
    }
}
