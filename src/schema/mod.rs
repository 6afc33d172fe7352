//! Static catalog of the nine TPC-C tables.
//!
//! Each table knows its column order (used to turn generator tuples into
//! records), the layout of its store key, how it is partitioned across shards,
//! and which non-key columns need a secondary index.
//!
//! Key fields are laid out partition column first, then the remaining key
//! columns from coarsest to finest. That way every "all rows of this
//! district" or "all lines of this order" lookup is a key prefix.

use crate::codec::{FieldKind, KeyCodec, KeyField};
use crate::core::{DriverError, Record, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DISTRICTS_PER_WAREHOUSE: i64 = 10;
pub const MAX_C_DATA: usize = 500;
pub const BAD_CREDIT: &str = "BC";
pub const GOOD_CREDIT: &str = "GC";
pub const ORIGINAL_STRING: &str = "ORIGINAL";
pub const STOCK_LEVEL_ORDERS: i64 = 20;

const W_WIDTH: usize = 6;
const D_WIDTH: usize = 2;
const C_WIDTH: usize = 6;
const I_WIDTH: usize = 7;
const O_WIDTH: usize = 10;
const OL_WIDTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Table {
    Item,
    Warehouse,
    District,
    Customer,
    Stock,
    Orders,
    NewOrder,
    OrderLine,
    History,
}

/// How a table's rows are spread over shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Owned by the shard of the warehouse id stored in this column.
    Column(&'static str),
    /// Copied to every shard.
    Replicated,
}

/// An integer key column rendered with a fixed number of digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: &'static str,
    pub width: usize,
}

const fn key(name: &'static str, width: usize) -> KeyColumn {
    KeyColumn { name, width }
}

/// Where a table's store key comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    Columns(&'static [KeyColumn]),
    /// The store key is a system-generated unique id.
    Generated,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::Item,
        Table::Warehouse,
        Table::District,
        Table::Customer,
        Table::Stock,
        Table::Orders,
        Table::NewOrder,
        Table::OrderLine,
        Table::History,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Item => "ITEM",
            Table::Warehouse => "WAREHOUSE",
            Table::District => "DISTRICT",
            Table::Customer => "CUSTOMER",
            Table::Stock => "STOCK",
            Table::Orders => "ORDERS",
            Table::NewOrder => "NEW_ORDER",
            Table::OrderLine => "ORDER_LINE",
            Table::History => "HISTORY",
        }
    }

    pub fn from_name(name: &str) -> Result<Table> {
        Table::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| DriverError::Config(format!("Unknown table '{}'", name)))
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Item => &["I_ID", "I_IM_ID", "I_NAME", "I_PRICE", "I_DATA"],
            Table::Warehouse => &[
                "W_ID", "W_NAME", "W_STREET_1", "W_STREET_2", "W_CITY", "W_STATE", "W_ZIP",
                "W_TAX", "W_YTD",
            ],
            Table::District => &[
                "D_ID", "D_W_ID", "D_NAME", "D_STREET_1", "D_STREET_2", "D_CITY", "D_STATE",
                "D_ZIP", "D_TAX", "D_YTD", "D_NEXT_O_ID",
            ],
            Table::Customer => &[
                "C_ID", "C_D_ID", "C_W_ID", "C_FIRST", "C_MIDDLE", "C_LAST", "C_STREET_1",
                "C_STREET_2", "C_CITY", "C_STATE", "C_ZIP", "C_PHONE", "C_SINCE", "C_CREDIT",
                "C_CREDIT_LIM", "C_DISCOUNT", "C_BALANCE", "C_YTD_PAYMENT", "C_PAYMENT_CNT",
                "C_DELIVERY_CNT", "C_DATA",
            ],
            Table::Stock => &[
                "S_I_ID", "S_W_ID", "S_QUANTITY", "S_DIST_01", "S_DIST_02", "S_DIST_03",
                "S_DIST_04", "S_DIST_05", "S_DIST_06", "S_DIST_07", "S_DIST_08", "S_DIST_09",
                "S_DIST_10", "S_YTD", "S_ORDER_CNT", "S_REMOTE_CNT", "S_DATA",
            ],
            Table::Orders => &[
                "O_ID", "O_C_ID", "O_D_ID", "O_W_ID", "O_ENTRY_D", "O_CARRIER_ID", "O_OL_CNT",
                "O_ALL_LOCAL",
            ],
            Table::NewOrder => &["NO_O_ID", "NO_D_ID", "NO_W_ID"],
            Table::OrderLine => &[
                "OL_O_ID", "OL_D_ID", "OL_W_ID", "OL_NUMBER", "OL_I_ID", "OL_SUPPLY_W_ID",
                "OL_DELIVERY_D", "OL_QUANTITY", "OL_AMOUNT", "OL_DIST_INFO",
            ],
            Table::History => &[
                "H_C_ID", "H_C_D_ID", "H_C_W_ID", "H_D_ID", "H_W_ID", "H_DATE", "H_AMOUNT",
                "H_DATA",
            ],
        }
    }

    pub fn key_layout(&self) -> KeyLayout {
        const ITEM: &[KeyColumn] = &[key("I_ID", I_WIDTH)];
        const WAREHOUSE: &[KeyColumn] = &[key("W_ID", W_WIDTH)];
        const DISTRICT: &[KeyColumn] = &[key("D_W_ID", W_WIDTH), key("D_ID", D_WIDTH)];
        const CUSTOMER: &[KeyColumn] = &[
            key("C_W_ID", W_WIDTH),
            key("C_D_ID", D_WIDTH),
            key("C_ID", C_WIDTH),
        ];
        const STOCK: &[KeyColumn] = &[key("S_W_ID", W_WIDTH), key("S_I_ID", I_WIDTH)];
        const ORDERS: &[KeyColumn] = &[
            key("O_W_ID", W_WIDTH),
            key("O_D_ID", D_WIDTH),
            key("O_ID", O_WIDTH),
        ];
        const NEW_ORDER: &[KeyColumn] = &[
            key("NO_W_ID", W_WIDTH),
            key("NO_D_ID", D_WIDTH),
            key("NO_O_ID", O_WIDTH),
        ];
        const ORDER_LINE: &[KeyColumn] = &[
            key("OL_W_ID", W_WIDTH),
            key("OL_D_ID", D_WIDTH),
            key("OL_O_ID", O_WIDTH),
            key("OL_NUMBER", OL_WIDTH),
        ];

        match self {
            Table::Item => KeyLayout::Columns(ITEM),
            Table::Warehouse => KeyLayout::Columns(WAREHOUSE),
            Table::District => KeyLayout::Columns(DISTRICT),
            Table::Customer => KeyLayout::Columns(CUSTOMER),
            Table::Stock => KeyLayout::Columns(STOCK),
            Table::Orders => KeyLayout::Columns(ORDERS),
            Table::NewOrder => KeyLayout::Columns(NEW_ORDER),
            Table::OrderLine => KeyLayout::Columns(ORDER_LINE),
            Table::History => KeyLayout::Generated,
        }
    }

    pub fn key_columns(&self) -> &'static [KeyColumn] {
        match self.key_layout() {
            KeyLayout::Columns(columns) => columns,
            KeyLayout::Generated => &[],
        }
    }

    pub fn field_kinds(&self) -> Vec<FieldKind> {
        self.key_columns()
            .iter()
            .map(|c| FieldKind::Padded(c.width))
            .collect()
    }

    pub fn partition(&self) -> Partition {
        match self {
            Table::Item => Partition::Replicated,
            Table::Warehouse => Partition::Column("W_ID"),
            Table::District => Partition::Column("D_W_ID"),
            Table::Customer => Partition::Column("C_W_ID"),
            Table::Stock => Partition::Column("S_W_ID"),
            Table::Orders => Partition::Column("O_W_ID"),
            Table::NewOrder => Partition::Column("NO_W_ID"),
            Table::OrderLine => Partition::Column("OL_W_ID"),
            Table::History => Partition::Column("H_W_ID"),
        }
    }

    /// Non-key columns looked up by value inside transactions.
    pub fn secondary_indexes(&self) -> &'static [&'static str] {
        match self {
            Table::Customer => &["C_LAST"],
            Table::Orders => &["O_C_ID"],
            _ => &[],
        }
    }

    /// Columns the store is asked to index natively at the end of the load phase.
    pub fn store_indexes(&self) -> &'static [&'static str] {
        match self {
            Table::Item => &["I_ID"],
            Table::Warehouse => &["W_ID"],
            Table::District => &["D_ID", "D_W_ID"],
            Table::Customer => &["C_ID", "C_D_ID", "C_W_ID", "C_LAST"],
            Table::Stock => &["S_I_ID", "S_W_ID"],
            Table::Orders => &["O_ID", "O_D_ID", "O_W_ID", "O_C_ID"],
            Table::NewOrder => &["NO_O_ID", "NO_D_ID", "NO_W_ID"],
            Table::OrderLine => &["OL_O_ID", "OL_D_ID", "OL_W_ID"],
            Table::History => &[],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    /// Position of `column` within the key layout, if it is a key column.
    pub fn key_position(&self, column: &str) -> Option<usize> {
        self.key_columns().iter().position(|c| c.name == column)
    }

    /// Encodes a full key from integer values given in key-layout order.
    pub fn key(&self, values: &[i64]) -> Result<String> {
        let columns = self.key_columns();
        if columns.is_empty() || values.len() != columns.len() {
            return Err(DriverError::Encoding(format!(
                "table {} takes {} key fields, got {}",
                self,
                columns.len(),
                values.len()
            )));
        }
        KeyCodec::encode(&self.fields(values))
    }

    /// Encodes the leading `values.len()` key fields as a scan prefix.
    pub fn prefix(&self, values: &[i64]) -> Result<String> {
        if values.len() > self.key_columns().len() {
            return Err(DriverError::Encoding(format!(
                "table {} takes at most {} key fields, got {}",
                self,
                self.key_columns().len(),
                values.len()
            )));
        }
        KeyCodec::encode_prefix(&self.fields(values))
    }

    /// Extracts and encodes the key of a full record.
    pub fn key_for(&self, record: &Record) -> Result<String> {
        let values = self
            .key_columns()
            .iter()
            .map(|c| record.i64(c.name))
            .collect::<Result<Vec<_>>>()?;
        self.key(&values)
    }

    /// Decodes a stored key back into its integer fields.
    pub fn decode_key(&self, key: &str) -> Result<Vec<i64>> {
        KeyCodec::decode_fields(key, &self.field_kinds())?
            .into_iter()
            .map(|f| match f {
                KeyField::Padded { value, .. } | KeyField::Int(value) => Ok(value),
                KeyField::Text(t) => Err(DriverError::Encoding(format!(
                    "unexpected text key field '{}' in table {}",
                    t, self
                ))),
            })
            .collect()
    }

    /// The warehouse id that decides which shard owns `record`.
    pub fn partition_value(&self, record: &Record) -> Result<Option<i64>> {
        match self.partition() {
            Partition::Column(column) => record.i64(column).map(Some),
            Partition::Replicated => Ok(None),
        }
    }

    fn fields(&self, values: &[i64]) -> Vec<KeyField> {
        self.key_columns()
            .iter()
            .zip(values)
            .map(|(c, v)| KeyField::padded(*v, c.width))
            .collect()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_every_key_and_partition_column_exists() {
        for table in Table::ALL {
            for column in table.key_columns() {
                assert!(table.has_column(column.name), "{} lacks {}", table, column.name);
            }
            if let Partition::Column(column) = table.partition() {
                assert!(table.has_column(column), "{} lacks {}", table, column);
                if !table.key_columns().is_empty() {
                    assert_eq!(table.key_position(column), Some(0));
                }
            }
            for column in table.secondary_indexes().iter().chain(table.store_indexes()) {
                assert!(table.has_column(column), "{} lacks {}", table, column);
            }
        }
    }

    #[test]
    fn test_key_for_record_matches_positional_key() {
        let record = Record::new()
            .with("O_ID", 42i64)
            .with("O_D_ID", 3i64)
            .with("O_W_ID", 1i64)
            .with("O_C_ID", Value::Integer(9));
        let key = Table::Orders.key_for(&record).unwrap();
        assert_eq!(key, Table::Orders.key(&[1, 3, 42]).unwrap());
        assert_eq!(Table::Orders.decode_key(&key).unwrap(), vec![1, 3, 42]);
    }

    #[test]
    fn test_table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::from_name(table.name()).unwrap(), table);
        }
        assert!(Table::from_name("NOPE").is_err());
        let json = serde_json::to_string(&Table::OrderLine).unwrap();
        assert_eq!(json, "\"ORDER_LINE\"");
    }

    #[test]
    fn test_history_key_is_generated() {
        assert_eq!(Table::History.key_layout(), KeyLayout::Generated);
        assert!(Table::History.key(&[1]).is_err());
    }
}
