//! One-time load phase: turns generator tuples into stored rows.

use crate::core::{Record, Result, Tuple};
use crate::routing::ShardRegistry;
use crate::schema::{KeyLayout, Table};
use std::sync::Arc;
use tracing::{Level, event};
use uuid::Uuid;

pub struct Loader {
    registry: Arc<ShardRegistry>,
}

impl Loader {
    pub fn new(registry: Arc<ShardRegistry>) -> Self {
        Self { registry }
    }

    /// Stores `tuples` (in the table's column order) on their owning shards.
    ///
    /// Item rows are written to every shard. History rows get a fresh key.
    pub async fn load_tuples(&self, table: Table, tuples: Vec<Tuple>) -> Result<usize> {
        let router = self.registry.router();
        let columns = table.columns();
        let mut loaded = 0;

        for tuple in tuples {
            let record = Record::from_tuple(columns, tuple)?;
            let shards = router.route_record(table, &record)?;
            let key = match table.key_layout() {
                KeyLayout::Columns(_) => table.key_for(&record)?,
                KeyLayout::Generated => Uuid::new_v4().to_string(),
            };
            for shard_id in shards {
                self.registry
                    .view_on(table, shard_id)?
                    .put_keyed(&key, record.clone())
                    .await?;
            }
            loaded += 1;
        }

        event!(Level::DEBUG, table = %table, rows = loaded, "loaded tuples");
        Ok(loaded)
    }

    /// Builds secondary indexes, asks every store to index and optimize the
    /// table's lookup columns, then flushes every shard.
    pub async fn load_finish(&self) -> Result<()> {
        for shard in self.registry.shards() {
            for table in Table::ALL {
                let view = self.registry.view_on(table, shard.id())?;
                for column in table.secondary_indexes() {
                    let distinct = view.build_index(column).await?;
                    event!(
                        Level::DEBUG,
                        shard = shard.id(),
                        table = %table,
                        column = *column,
                        distinct,
                        "built secondary index"
                    );
                }

                let client = shard.client(table)?;
                for column in table.store_indexes() {
                    client.create_index(column).await?;
                }
                for column in table.store_indexes() {
                    client.optimize_index(column).await?;
                }
            }
        }

        self.registry.sync_all().await?;
        event!(
            Level::INFO,
            shards = self.registry.shards().count(),
            "load finished"
        );
        Ok(())
    }
}
