//! Relational emulation over a point-lookup store.
//!
//! A [`RelationalView`] presents one table on one shard as a filterable
//! collection. Filters are resolved, best first, as a single `get`, a
//! secondary-index lookup, a bounded fan-out of key lookups, a key-prefix
//! scan, or (only when explicitly allowed) a full-table scan. Rows are always
//! re-checked against the whole filter after retrieval.

pub mod filter;
pub mod index;

use crate::core::{DriverError, KeyedRecord, Record, Result, Value};
use crate::schema::Table;
use crate::store::StoreClient;
use futures::TryStreamExt;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{Level, event};

pub use filter::{Filter, Predicate};
pub use index::SecondaryIndex;

/// Largest integer range expanded into individual key lookups.
const MAX_FAN_OUT: i64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// How a filter is resolved against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    Point(String),
    /// Index lookup narrowed to keys under `prefix`, the bound leading key fields.
    Index { column: String, prefix: String },
    Points(Vec<String>),
    Prefixes(Vec<String>),
    FullScan,
}

/// Sum over a materialized row set, carrying how many rows contributed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub sum: f64,
    pub rows: usize,
}

impl Aggregate {
    /// The sum, or `EmptyAggregate` when no rows contributed.
    pub fn require_rows(self, table: Table, column: &str, context: &str) -> Result<f64> {
        if self.rows == 0 {
            event!(
                Level::ERROR,
                table = %table,
                column = column,
                context = context,
                "aggregate computed over zero rows"
            );
            return Err(DriverError::EmptyAggregate {
                table: table.name().to_string(),
                field: column.to_string(),
                context: context.to_string(),
            });
        }
        Ok(self.sum)
    }
}

pub struct RelationalView {
    table: Table,
    shard_id: u32,
    client: Arc<dyn StoreClient>,
    indexes: Arc<SecondaryIndex>,
}

impl RelationalView {
    pub fn new(
        table: Table,
        shard_id: u32,
        client: Arc<dyn StoreClient>,
        indexes: Arc<SecondaryIndex>,
    ) -> Self {
        Self {
            table,
            shard_id,
            client,
            indexes,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    pub fn client(&self) -> &Arc<dyn StoreClient> {
        &self.client
    }

    /// Point lookup by key values in key-layout order.
    pub async fn get(&self, key_values: &[i64]) -> Result<Option<KeyedRecord>> {
        let key = self.table.key(key_values)?;
        Ok(self
            .client
            .get(&key)
            .await?
            .map(|record| KeyedRecord::new(key, record)))
    }

    /// Point lookup of a row the caller's data model says must exist.
    pub async fn require(&self, key_values: &[i64]) -> Result<KeyedRecord> {
        self.get(key_values)
            .await?
            .ok_or_else(|| DriverError::MissingRow {
                table: self.table.name().to_string(),
                key: key_values
                    .iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            })
    }

    pub async fn plan(&self, filter: &Filter) -> Result<AccessPath> {
        let columns = self.table.key_columns();

        let bound: Vec<i64> = columns
            .iter()
            .map_while(|c| filter.eq_int(c.name))
            .collect();

        if !columns.is_empty() && bound.len() == columns.len() {
            return Ok(AccessPath::Point(self.table.key(&bound)?));
        }

        for (column, predicate) in filter.predicates() {
            if matches!(predicate, Predicate::Eq(_))
                && self.indexes.is_indexed(self.table, column).await
            {
                return Ok(AccessPath::Index {
                    column: column.clone(),
                    prefix: self.table.prefix(&bound)?,
                });
            }
        }

        if let Some(next) = columns.get(bound.len()) {
            if let Some((start, end)) = filter.range_of(next.name) {
                if end - start <= MAX_FAN_OUT {
                    let last = bound.len() + 1 == columns.len();
                    let mut targets = Vec::new();
                    for value in start.max(0)..end {
                        let mut values = bound.clone();
                        values.push(value);
                        targets.push(if last {
                            self.table.key(&values)?
                        } else {
                            self.table.prefix(&values)?
                        });
                    }
                    return Ok(if last {
                        AccessPath::Points(targets)
                    } else {
                        AccessPath::Prefixes(targets)
                    });
                }
            }
        }

        if !bound.is_empty() {
            return Ok(AccessPath::Prefixes(vec![self.table.prefix(&bound)?]));
        }

        if filter.full_scan_allowed() {
            return Ok(AccessPath::FullScan);
        }
        event!(
            Level::WARN,
            table = %self.table,
            shard = self.shard_id,
            "rejected filter that needs a full-table scan"
        );
        Err(DriverError::InvalidParameters(format!(
            "filter on {} binds no key prefix or indexed column and would need a full-table scan",
            self.table
        )))
    }

    /// Rows matching every predicate of `filter`.
    pub async fn filter(&self, filter: &Filter) -> Result<Vec<KeyedRecord>> {
        let path = self.plan(filter).await?;
        let mut rows = Vec::new();
        match path {
            AccessPath::Point(key) => {
                if let Some(record) = self.client.get(&key).await? {
                    rows.push(KeyedRecord::new(key, record));
                }
            }
            AccessPath::Points(keys) => {
                for key in keys {
                    if let Some(record) = self.client.get(&key).await? {
                        rows.push(KeyedRecord::new(key, record));
                    }
                }
            }
            AccessPath::Index { column, prefix } => {
                let value = filter.eq_value(&column).cloned().unwrap_or(Value::Null);
                for key in self.index_keys(&column, &value, &prefix).await? {
                    if let Some(record) = self.client.get(&key).await? {
                        rows.push(KeyedRecord::new(key, record));
                    }
                }
            }
            AccessPath::Prefixes(prefixes) => {
                for prefix in prefixes {
                    self.scan_into(&prefix, filter, &mut rows).await?;
                }
                return Ok(rows);
            }
            AccessPath::FullScan => {
                event!(
                    Level::DEBUG,
                    table = %self.table,
                    shard = self.shard_id,
                    "filter resolved by full-table scan"
                );
                self.scan_into("", filter, &mut rows).await?;
                return Ok(rows);
            }
        }
        rows.retain(|row| filter.matches(&row.record));
        Ok(rows)
    }

    /// Index postings for `column = value` whose keys start with `prefix`.
    async fn index_keys(&self, column: &str, value: &Value, prefix: &str) -> Result<Vec<String>> {
        let Some(keys) = self.indexes.lookup(self.table, column, value).await else {
            event!(
                Level::WARN,
                table = %self.table,
                shard = self.shard_id,
                column,
                "secondary index dropped between plan and lookup"
            );
            return Err(DriverError::IndexDropped {
                table: self.table.name().to_string(),
                column: column.to_string(),
            });
        };
        Ok(keys
            .range(prefix.to_string()..)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn scan_into(&self, prefix: &str, filter: &Filter, rows: &mut Vec<KeyedRecord>) -> Result<()> {
        let mut stream = self.client.scan_prefix(prefix).await?;
        while let Some(row) = stream.try_next().await? {
            if filter.matches(&row.record) {
                rows.push(row);
            }
        }
        Ok(())
    }

    /// Every row of the table on this shard.
    pub async fn scan_all(&self) -> Result<Vec<KeyedRecord>> {
        self.filter(&Filter::new().allow_full_scan()).await
    }

    /// Upserts `record` under the key derived from its key columns.
    pub async fn put(&self, record: Record) -> Result<String> {
        let key = self.table.key_for(&record)?;
        self.put_keyed(&key, record).await?;
        Ok(key)
    }

    /// Upserts `record` under an explicit key, keeping secondary indexes current.
    pub async fn put_keyed(&self, key: &str, record: Record) -> Result<()> {
        let old = if self.indexes.has_indexes(self.table).await {
            self.client.get(key).await?
        } else {
            None
        };
        self.write(key, old.as_ref(), record).await
    }

    async fn write(&self, key: &str, old: Option<&Record>, record: Record) -> Result<()> {
        self.client.put(key, record.clone()).await?;
        self.indexes.on_put(self.table, key, old, &record).await;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let old = if self.indexes.has_indexes(self.table).await {
            self.client.get(key).await?
        } else {
            None
        };
        self.client.delete(key).await?;
        if let Some(old) = old {
            self.indexes.on_delete(self.table, key, &old).await;
        }
        Ok(())
    }

    /// Read-modify-write of one row.
    ///
    /// Not atomic: a concurrent writer to the same key between the `get` and
    /// the `put` is silently overwritten.
    pub async fn update<F>(&self, key: &str, mutator: F) -> Result<Record>
    where
        F: FnOnce(&mut Record) -> Result<()> + Send,
    {
        let old = self
            .client
            .get(key)
            .await?
            .ok_or_else(|| DriverError::MissingRow {
                table: self.table.name().to_string(),
                key: key.to_string(),
            })?;
        let mut record = old.clone();
        mutator(&mut record)?;
        self.write(key, Some(&old), record.clone()).await?;
        Ok(record)
    }

    /// Builds the in-memory secondary index on `column` from the stored rows.
    pub async fn build_index(&self, column: &str) -> Result<usize> {
        if !self.table.has_column(column) {
            return Err(DriverError::InvalidParameters(format!(
                "table {} has no column '{}'",
                self.table, column
            )));
        }
        let rows = self.scan_all().await?;
        Ok(self.indexes.create(self.table, column, &rows).await)
    }
}

/// Sorts a materialized row set by `column`. NULLs sort last ascending.
pub fn order_by(mut rows: Vec<KeyedRecord>, column: &str, direction: Direction) -> Result<Vec<KeyedRecord>> {
    let mut failure = None;
    rows.sort_by(|a, b| {
        let left = a.record.get(column).cloned().unwrap_or(Value::Null);
        let right = b.record.get(column).cloned().unwrap_or(Value::Null);
        let ordering = match left.compare(&right) {
            Ok(ordering) => ordering,
            Err(err) => {
                failure.get_or_insert(err);
                Ordering::Equal
            }
        };
        match direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(rows),
    }
}

/// Sums a numeric column over `rows`; NULLs are skipped but still counted as rows.
pub fn aggregate_sum(rows: &[KeyedRecord], column: &str) -> Result<Aggregate> {
    let mut sum = 0.0;
    for row in rows {
        let value = row.record.value(column)?;
        if value.is_null() {
            continue;
        }
        sum += value.as_f64().ok_or_else(|| {
            DriverError::TypeMismatch(format!(
                "cannot sum {} column '{}'",
                value.type_name(),
                column
            ))
        })?;
    }
    Ok(Aggregate {
        sum,
        rows: rows.len(),
    })
}
