use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Unknown shard {shard} for table '{table}'")]
    UnknownShard { table: String, shard: u32 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("No customer with last name '{c_last}' in warehouse {w_id}, district {d_id}")]
    CustomerNotFound { w_id: i64, d_id: i64, c_last: String },

    #[error("Aggregate over '{table}.{field}' found no rows: {context}")]
    EmptyAggregate {
        table: String,
        field: String,
        context: String,
    },

    #[error("Row '{key}' missing from table '{table}'")]
    MissingRow { table: String, key: String },

    #[error("Index on '{table}.{column}' disappeared before it could be read")]
    IndexDropped { table: String, column: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Benchmark worker failed: {0}")]
    Worker(String),
}

impl DriverError {
    /// Shard misconfiguration or an unreachable store.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::UnknownShard { .. } | Self::StoreUnavailable(_) | Self::Io(_)
        )
    }

    /// The loaded data violates the relational model the profiles rely on.
    pub fn is_modeling(&self) -> bool {
        matches!(self, Self::EmptyAggregate { .. } | Self::MissingRow { .. })
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
