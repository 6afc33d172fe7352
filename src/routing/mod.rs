pub mod registry;

use crate::connection::config::ShardMapping;
use crate::core::{DriverError, Record, Result};
use crate::schema::{Partition, Table};
use std::collections::BTreeSet;

pub use registry::{Shard, ShardRegistry};

/// Maps partition values (warehouse ids) to shard ids.
#[derive(Debug, Clone)]
pub struct ShardRouter {
    mapping: ShardMapping,
    shards: BTreeSet<u32>,
}

impl ShardRouter {
    pub fn new(mapping: ShardMapping, shards: impl IntoIterator<Item = u32>) -> Result<Self> {
        let shards: BTreeSet<u32> = shards.into_iter().collect();
        if shards.is_empty() {
            return Err(DriverError::Config(
                "router needs at least one shard".to_string(),
            ));
        }
        if let ShardMapping::Modulo { shard_count } = mapping {
            if shard_count == 0 {
                return Err(DriverError::Config("shard_count must be >= 1".to_string()));
            }
        }
        Ok(Self { mapping, shards })
    }

    pub fn mapping(&self) -> ShardMapping {
        self.mapping
    }

    /// Resolves the shard owning rows of `table` with partition value `warehouse_id`.
    ///
    /// Fails with `UnknownShard` when the mapped shard has no connection.
    pub fn route(&self, table: Table, warehouse_id: i64) -> Result<u32> {
        let shard = match self.mapping {
            ShardMapping::Identity => u32::try_from(warehouse_id).ok(),
            ShardMapping::Modulo { shard_count } => {
                u32::try_from(warehouse_id.rem_euclid(i64::from(shard_count))).ok()
            }
        };
        match shard {
            Some(shard) if self.shards.contains(&shard) => Ok(shard),
            _ => Err(DriverError::UnknownShard {
                table: table.name().to_string(),
                shard: shard.unwrap_or(u32::MAX),
            }),
        }
    }

    /// Every known shard, for replicated tables.
    pub fn targets(&self) -> Vec<u32> {
        self.shards.iter().copied().collect()
    }

    /// Shards that must hold `record`: its owner, or all of them for replicated tables.
    pub fn route_record(&self, table: Table, record: &Record) -> Result<Vec<u32>> {
        match table.partition() {
            Partition::Replicated => Ok(self.targets()),
            Partition::Column(column) => Ok(vec![self.route(table, record.i64(column)?)?]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_routing() {
        let router = ShardRouter::new(ShardMapping::Identity, [1, 2]).unwrap();
        assert_eq!(router.route(Table::Stock, 2).unwrap(), 2);
        let err = router.route(Table::Stock, 3).unwrap_err();
        assert!(matches!(err, DriverError::UnknownShard { shard: 3, .. }));
        assert!(router.route(Table::Stock, -1).is_err());
    }

    #[test]
    fn test_modulo_routing() {
        let router =
            ShardRouter::new(ShardMapping::Modulo { shard_count: 2 }, [0, 1]).unwrap();
        assert_eq!(router.route(Table::Customer, 1).unwrap(), 1);
        assert_eq!(router.route(Table::Customer, 4).unwrap(), 0);
    }

    #[test]
    fn test_replicated_record_targets_every_shard() {
        let router = ShardRouter::new(ShardMapping::Identity, [1, 2, 3]).unwrap();
        let item = Record::new().with("I_ID", 5i64);
        assert_eq!(router.route_record(Table::Item, &item).unwrap(), vec![1, 2, 3]);

        let stock = Record::new().with("S_W_ID", 2i64).with("S_I_ID", 5i64);
        assert_eq!(router.route_record(Table::Stock, &stock).unwrap(), vec![2]);
    }

    #[test]
    fn test_empty_router_is_rejected() {
        assert!(ShardRouter::new(ShardMapping::Identity, []).is_err());
        assert!(ShardRouter::new(ShardMapping::Modulo { shard_count: 0 }, [0]).is_err());
    }
}
