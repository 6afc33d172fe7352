#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tpcc_kv::connection::config::ShardMapping;
use tpcc_kv::routing::Shard;
use tpcc_kv::{
    InMemoryStore, KeyedRecord, Loader, Record, ShardRegistry, StoreClient, Table,
    TransactionEngine,
};

pub const ITEMS: i64 = 10;
pub const CUSTOMERS: i64 = 3;

/// In-memory shards with direct handles to every store.
pub struct Fixture {
    pub registry: Arc<ShardRegistry>,
    pub engine: Arc<TransactionEngine>,
    pub loader: Loader,
    pub stores: BTreeMap<(u32, Table), Arc<InMemoryStore>>,
}

impl Fixture {
    pub fn empty(shards: &[u32]) -> Self {
        Self::build(shards, None)
    }

    pub fn with_latency(shards: &[u32], latency: Duration) -> Self {
        Self::build(shards, Some(latency))
    }

    fn build(shard_ids: &[u32], latency: Option<Duration>) -> Self {
        let mut stores = BTreeMap::new();
        let mut shards = BTreeMap::new();
        for &shard_id in shard_ids {
            let mut clients: HashMap<Table, Arc<dyn StoreClient>> = HashMap::new();
            for table in Table::ALL {
                let store = InMemoryStore::new(format!("shard-{}/{}", shard_id, table));
                let store = Arc::new(match latency {
                    Some(latency) => store.with_latency(latency),
                    None => store,
                });
                clients.insert(table, Arc::clone(&store) as Arc<dyn StoreClient>);
                stores.insert((shard_id, table), store);
            }
            shards.insert(shard_id, Shard::new(shard_id, clients));
        }
        let registry =
            Arc::new(ShardRegistry::from_shards(ShardMapping::Identity, shards).unwrap());
        Self {
            engine: Arc::new(TransactionEngine::new(Arc::clone(&registry))),
            loader: Loader::new(Arc::clone(&registry)),
            registry,
            stores,
        }
    }

    /// Small hand-built dataset on every shard, one warehouse per shard.
    ///
    /// * items 1..=10 priced at their id; item 1 carries "ORIGINAL"
    /// * every district starts with `D_NEXT_O_ID = 1`, tax 0.05
    /// * every district has customers Cy(1, BC), Amy(2), Bob(3), all SMITH
    /// * every stock row starts at quantity 50
    pub async fn seeded(shards: &[u32]) -> Self {
        let fixture = Self::empty(shards);
        fixture.seed().await;
        fixture
    }

    pub async fn seed(&self) {
        for i_id in 1..=ITEMS {
            self.put(
                Table::Item,
                Record::new()
                    .with("I_ID", i_id)
                    .with("I_IM_ID", i_id)
                    .with("I_NAME", format!("item-{}", i_id))
                    .with("I_PRICE", i_id as f64)
                    .with("I_DATA", if i_id == 1 { "an ORIGINAL item" } else { "plain item" }),
            )
            .await;
        }

        let warehouses: Vec<i64> = self.registry.shards().map(|s| i64::from(s.id())).collect();
        for w_id in warehouses {
            self.put(
                Table::Warehouse,
                Record::new()
                    .with("W_ID", w_id)
                    .with("W_NAME", format!("WH{}", w_id))
                    .with("W_TAX", 0.1)
                    .with("W_YTD", 0.0),
            )
            .await;

            for d_id in 1..=10i64 {
                self.put(
                    Table::District,
                    Record::new()
                        .with("D_ID", d_id)
                        .with("D_W_ID", w_id)
                        .with("D_NAME", format!("D{}", d_id))
                        .with("D_TAX", 0.05)
                        .with("D_YTD", 0.0)
                        .with("D_NEXT_O_ID", 1i64),
                )
                .await;

                for (c_id, first, credit) in [(1, "Cy", "BC"), (2, "Amy", "GC"), (3, "Bob", "GC")] {
                    self.put(
                        Table::Customer,
                        Record::new()
                            .with("C_ID", c_id as i64)
                            .with("C_D_ID", d_id)
                            .with("C_W_ID", w_id)
                            .with("C_FIRST", first)
                            .with("C_MIDDLE", "OE")
                            .with("C_LAST", "SMITH")
                            .with("C_CREDIT", credit)
                            .with("C_DISCOUNT", 0.1)
                            .with("C_BALANCE", 0.0)
                            .with("C_YTD_PAYMENT", 0.0)
                            .with("C_PAYMENT_CNT", 0i64)
                            .with("C_DELIVERY_CNT", 0i64)
                            .with("C_DATA", "old data"),
                    )
                    .await;
                }
            }

            for i_id in 1..=ITEMS {
                let mut stock = Record::new()
                    .with("S_I_ID", i_id)
                    .with("S_W_ID", w_id)
                    .with("S_QUANTITY", 50i64)
                    .with("S_YTD", 0i64)
                    .with("S_ORDER_CNT", 0i64)
                    .with("S_REMOTE_CNT", 0i64)
                    .with("S_DATA", if i_id == 1 { "ORIGINAL stock" } else { "stock" });
                for d_id in 1..=10i64 {
                    stock.set(&format!("S_DIST_{:02}", d_id), format!("dist-{:02}", d_id));
                }
                self.put(Table::Stock, stock).await;
            }
        }

        self.loader.load_finish().await.unwrap();
    }

    /// Writes `record` to every shard that owns it.
    pub async fn put(&self, table: Table, record: Record) {
        for shard in self.registry.router().route_record(table, &record).unwrap() {
            self.registry
                .view_on(table, shard)
                .unwrap()
                .put(record.clone())
                .await
                .unwrap();
        }
    }

    pub async fn get(&self, table: Table, w_id: i64, key: &[i64]) -> Option<Record> {
        self.registry
            .view(table, w_id)
            .unwrap()
            .get(key)
            .await
            .unwrap()
            .map(|row| row.record)
    }

    pub async fn row(&self, table: Table, w_id: i64, key: &[i64]) -> Record {
        self.get(table, w_id, key)
            .await
            .unwrap_or_else(|| panic!("{} row {:?} missing", table, key))
    }

    pub async fn all(&self, table: Table, shard: u32) -> Vec<KeyedRecord> {
        self.registry
            .view_on(table, shard)
            .unwrap()
            .scan_all()
            .await
            .unwrap()
    }

    pub async fn set_next_order_id(&self, w_id: i64, d_id: i64, next: i64) {
        let view = self.registry.view(Table::District, w_id).unwrap();
        let key = Table::District.key(&[w_id, d_id]).unwrap();
        view.update(&key, |d| {
            d.set("D_NEXT_O_ID", next);
            Ok(())
        })
        .await
        .unwrap();
    }

    pub async fn set_stock_quantity(&self, w_id: i64, i_id: i64, quantity: i64) {
        let view = self.registry.view(Table::Stock, w_id).unwrap();
        let key = Table::Stock.key(&[w_id, i_id]).unwrap();
        view.update(&key, |s| {
            s.set("S_QUANTITY", quantity);
            Ok(())
        })
        .await
        .unwrap();
    }

    pub fn store(&self, shard: u32, table: Table) -> &Arc<InMemoryStore> {
        &self.stores[&(shard, table)]
    }
}
