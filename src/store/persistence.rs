//! Snapshot persistence for the in-memory store.

use crate::core::{DriverError, Record, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
    pub records: BTreeMap<String, Record>,
}

impl StoreSnapshot {
    pub fn new(endpoint: impl Into<String>, records: BTreeMap<String, Record>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            endpoint: endpoint.into(),
            created_at: Utc::now(),
            records,
        }
    }
}

/// Writes `snapshot` to `path` atomically: a temp file in the same directory
/// is fully written and fsynced, then renamed over the target.
pub fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, snapshot)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| DriverError::Io(format!("Failed to persist snapshot: {}", e)))?;
    Ok(())
}

/// Reads a snapshot, returning `None` when no file exists yet.
pub fn read_snapshot(path: &Path) -> Result<Option<StoreSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = fs::File::open(path)?;
    let snapshot: StoreSnapshot = serde_json::from_reader(BufReader::new(file))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(DriverError::Serialization(format!(
            "Unsupported snapshot version {} in {}",
            snapshot.version,
            path.display()
        )));
    }
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_write_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shard-1").join("ITEM.json");

        let mut records = BTreeMap::new();
        records.insert(
            "0000001".to_string(),
            Record::new().with("I_ID", 1i64).with("I_PRICE", 2.5),
        );
        write_snapshot(&path, &StoreSnapshot::new("localhost:19780/ITEM", records)).unwrap();

        let loaded = read_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records["0000001"].f64("I_PRICE").unwrap(), 2.5);
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_snapshot(&dir.path().join("absent.json")).unwrap().is_none());
    }
}
