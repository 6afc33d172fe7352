use crate::core::{KeyedRecord, Record, Value};
use crate::schema::Table;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

type IndexId = (Table, String);
type Postings = HashMap<Value, BTreeSet<String>>;

/// Shard-local secondary indexes: `(table, column, value)` to owning keys.
///
/// Updated on every put/delete issued through a [`RelationalView`](super::RelationalView).
/// The index update is a separate step from the store write, so a reader
/// racing a writer can briefly see the index disagree with the store.
#[derive(Debug, Default)]
pub struct SecondaryIndex {
    indexes: RwLock<HashMap<IndexId, Postings>>,
}

impl SecondaryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_indexed(&self, table: Table, column: &str) -> bool {
        self.indexes
            .read()
            .await
            .contains_key(&(table, column.to_string()))
    }

    pub async fn has_indexes(&self, table: Table) -> bool {
        self.indexes.read().await.keys().any(|(t, _)| *t == table)
    }

    /// (Re)builds the index on `table.column` from `rows`.
    pub async fn create(&self, table: Table, column: &str, rows: &[KeyedRecord]) -> usize {
        let mut postings: Postings = HashMap::new();
        for row in rows {
            if let Some(value) = row.record.get(column) {
                postings
                    .entry(value.clone())
                    .or_default()
                    .insert(row.key.clone());
            }
        }
        let distinct = postings.len();
        self.indexes
            .write()
            .await
            .insert((table, column.to_string()), postings);
        distinct
    }

    /// Keys whose `column` equals `value`, or `None` if the column is not indexed.
    pub async fn lookup(&self, table: Table, column: &str, value: &Value) -> Option<BTreeSet<String>> {
        let indexes = self.indexes.read().await;
        let postings = indexes.get(&(table, column.to_string()))?;
        Some(postings.get(value).cloned().unwrap_or_default())
    }

    pub async fn on_put(&self, table: Table, key: &str, old: Option<&Record>, new: &Record) {
        let mut indexes = self.indexes.write().await;
        for ((t, column), postings) in indexes.iter_mut() {
            if *t != table {
                continue;
            }
            let old_value = old.and_then(|r| r.get(column));
            let new_value = new.get(column);
            if old_value == new_value {
                continue;
            }
            if let Some(old_value) = old_value {
                remove_posting(postings, old_value, key);
            }
            if let Some(new_value) = new_value {
                postings
                    .entry(new_value.clone())
                    .or_default()
                    .insert(key.to_string());
            }
        }
    }

    pub async fn on_delete(&self, table: Table, key: &str, old: &Record) {
        let mut indexes = self.indexes.write().await;
        for ((t, column), postings) in indexes.iter_mut() {
            if *t != table {
                continue;
            }
            if let Some(value) = old.get(column) {
                remove_posting(postings, value, key);
            }
        }
    }

    pub async fn clear(&self) {
        self.indexes.write().await.clear();
    }
}

fn remove_posting(postings: &mut Postings, value: &Value, key: &str) {
    if let Some(keys) = postings.get_mut(value) {
        keys.remove(key);
        if keys.is_empty() {
            postings.remove(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(key: &str, last: &str) -> KeyedRecord {
        KeyedRecord::new(key, Record::new().with("C_LAST", last))
    }

    #[tokio::test]
    async fn test_lookup_requires_index() {
        let index = SecondaryIndex::new();
        assert!(index.lookup(Table::Customer, "C_LAST", &"SMITH".into()).await.is_none());

        index
            .create(Table::Customer, "C_LAST", &[customer("a", "SMITH"), customer("b", "JONES")])
            .await;
        let keys = index.lookup(Table::Customer, "C_LAST", &"SMITH".into()).await.unwrap();
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["a"]);
        assert!(index.lookup(Table::Customer, "C_LAST", &"NOBODY".into()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_moves_key_between_values() {
        let index = SecondaryIndex::new();
        let old = customer("a", "SMITH");
        index.create(Table::Customer, "C_LAST", std::slice::from_ref(&old)).await;

        let new = Record::new().with("C_LAST", "JONES");
        index.on_put(Table::Customer, "a", Some(&old.record), &new).await;

        assert!(index.lookup(Table::Customer, "C_LAST", &"SMITH".into()).await.unwrap().is_empty());
        assert_eq!(index.lookup(Table::Customer, "C_LAST", &"JONES".into()).await.unwrap().len(), 1);

        index.on_delete(Table::Customer, "a", &new).await;
        assert!(index.lookup(Table::Customer, "C_LAST", &"JONES".into()).await.unwrap().is_empty());
    }
}
