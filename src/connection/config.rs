use crate::core::{DriverError, Result};
use crate::schema::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const BASE_PORT: u16 = 19780;
const TABLE_PORT_STEP: u16 = 10;
const SHARD_PORT_STEP: u16 = 100;

/// Address of one table server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub persistent: bool,
}

impl EndpointConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            persistent: true,
        }
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}

/// How a warehouse id picks its shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ShardMapping {
    /// The warehouse id is the shard id.
    #[default]
    Identity,
    /// Warehouses wrap around `shard_count` shards numbered from zero.
    Modulo { shard_count: u32 },
}

/// Driver configuration: which servers hold which shard of which table.
///
/// Mirrors a per-table server map:
///
/// ```json
/// {
///   "servers": { "1": { "ITEM": { "host": "localhost", "port": 19880 }, "...": {} } },
///   "reset": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    pub servers: BTreeMap<u32, BTreeMap<Table, EndpointConfig>>,

    /// Clear every table on every shard before loading.
    #[serde(default)]
    pub reset: bool,

    #[serde(default)]
    pub shard_mapping: ShardMapping,

    /// Flush every written client at the end of each transaction profile.
    #[serde(default)]
    pub sync_on_commit: bool,

    /// Delivery skip rate above which the run is flagged.
    #[serde(default = "default_skip_threshold")]
    pub delivery_skip_threshold: f64,

    /// Where persistent in-memory stores keep their snapshots.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_skip_threshold() -> f64 {
    0.01
}

impl DriverConfig {
    /// One shard per id, every table on its own port, all on localhost.
    pub fn default_for(shard_ids: impl IntoIterator<Item = u32>) -> Self {
        let mut servers = BTreeMap::new();
        for (slot, shard_id) in shard_ids.into_iter().enumerate() {
            let shard_base = BASE_PORT.saturating_add(SHARD_PORT_STEP.saturating_mul(slot as u16));
            let tables = Table::ALL
                .iter()
                .enumerate()
                .map(|(idx, table)| {
                    let port = shard_base.saturating_add(TABLE_PORT_STEP * idx as u16);
                    (*table, EndpointConfig::new("localhost", port))
                })
                .collect();
            servers.insert(shard_id, tables);
        }
        Self {
            servers,
            reset: false,
            shard_mapping: ShardMapping::Identity,
            sync_on_commit: false,
            delivery_skip_threshold: default_skip_threshold(),
            data_dir: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DriverError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DriverError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Set the reset flag
    pub fn reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Set the shard mapping
    pub fn shard_mapping(mut self, mapping: ShardMapping) -> Self {
        self.shard_mapping = mapping;
        self
    }

    /// Sync written clients after each profile
    pub fn sync_on_commit(mut self, enabled: bool) -> Self {
        self.sync_on_commit = enabled;
        self
    }

    /// Set the delivery skip threshold
    pub fn delivery_skip_threshold(mut self, threshold: f64) -> Self {
        self.delivery_skip_threshold = threshold;
        self
    }

    /// Set the snapshot directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn shard_ids(&self) -> Vec<u32> {
        self.servers.keys().copied().collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(DriverError::Config(
                "at least one shard must be configured".to_string(),
            ));
        }
        for (shard_id, tables) in &self.servers {
            for table in Table::ALL {
                let endpoint = tables.get(&table).ok_or_else(|| {
                    DriverError::Config(format!(
                        "shard {} has no endpoint for table {}",
                        shard_id, table
                    ))
                })?;
                if endpoint.host.trim().is_empty() {
                    return Err(DriverError::Config(format!(
                        "shard {} table {} has an empty host",
                        shard_id, table
                    )));
                }
                if endpoint.port == 0 {
                    return Err(DriverError::Config(format!(
                        "shard {} table {} has port 0",
                        shard_id, table
                    )));
                }
            }
        }
        if let ShardMapping::Modulo { shard_count } = self.shard_mapping {
            if shard_count == 0 {
                return Err(DriverError::Config("shard_count must be >= 1".to_string()));
            }
        }
        if !(0.0..=1.0).contains(&self.delivery_skip_threshold) {
            return Err(DriverError::Config(format!(
                "delivery_skip_threshold must be within [0, 1], got {}",
                self.delivery_skip_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_plan() {
        let config = DriverConfig::default_for([1, 2]);
        assert_eq!(config.servers[&1][&Table::Item].port, 19780);
        assert_eq!(config.servers[&1][&Table::History].port, 19860);
        assert_eq!(config.servers[&2][&Table::Item].port, 19880);
        config.validate().unwrap();
    }

    #[test]
    fn test_json_round_trip() {
        let config = DriverConfig::default_for([1])
            .reset(true)
            .shard_mapping(ShardMapping::Modulo { shard_count: 1 });
        let json = serde_json::to_string(&config).unwrap();
        let parsed = DriverConfig::from_json_str(&json).unwrap();
        assert!(parsed.reset);
        assert_eq!(parsed.shard_mapping, ShardMapping::Modulo { shard_count: 1 });
        assert_eq!(parsed.servers, config.servers);
    }

    #[test]
    fn test_missing_table_is_rejected() {
        let mut config = DriverConfig::default_for([1]);
        config.servers.get_mut(&1).unwrap().remove(&Table::Stock);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("STOCK"));
    }

    #[test]
    fn test_defaults_applied_when_fields_absent() {
        let json = r#"{"servers": {"1": {
            "ITEM": {"host": "h", "port": 1}, "WAREHOUSE": {"host": "h", "port": 2},
            "DISTRICT": {"host": "h", "port": 3}, "CUSTOMER": {"host": "h", "port": 4},
            "STOCK": {"host": "h", "port": 5}, "ORDERS": {"host": "h", "port": 6},
            "NEW_ORDER": {"host": "h", "port": 7}, "ORDER_LINE": {"host": "h", "port": 8},
            "HISTORY": {"host": "h", "port": 9, "persistent": false}
        }}}"#;
        let config = DriverConfig::from_json_str(json).unwrap();
        assert!(!config.reset);
        assert_eq!(config.shard_mapping, ShardMapping::Identity);
        assert_eq!(config.delivery_skip_threshold, 0.01);
        assert!(config.servers[&1][&Table::Item].persistent);
        assert!(!config.servers[&1][&Table::History].persistent);
    }
}
