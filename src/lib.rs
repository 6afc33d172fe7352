// ============================================================================
// tpcc-kv Library
// ============================================================================

pub mod codec;
pub mod connection;
pub mod core;
pub mod engine;
pub mod loader;
pub mod routing;
pub mod schema;
pub mod store;
pub mod view;
pub mod workload;

// Re-export main types for convenience
pub use codec::{KeyCodec, KeyField};
pub use connection::config::{DriverConfig, EndpointConfig, ShardMapping};
pub use core::{DriverError, KeyedRecord, Record, Result, Tuple, Value};
pub use engine::{AbortReason, TransactionEngine, TxnOutcome};
pub use loader::Loader;
pub use routing::{ShardRegistry, ShardRouter};
pub use schema::Table;
pub use store::{InMemoryConnector, InMemoryStore, StoreClient, StoreConnector};
pub use view::{Filter, RelationalView};

use std::sync::Arc;

/// Connects every configured shard and returns the engine and loader sharing it.
///
/// Honors `config.reset` by clearing all tables before returning.
pub async fn connect(
    config: &DriverConfig,
    connector: &dyn StoreConnector,
) -> Result<(Arc<TransactionEngine>, Loader)> {
    let registry = Arc::new(ShardRegistry::connect(config, connector).await?);
    let engine = Arc::new(TransactionEngine::from_config(Arc::clone(&registry), config));
    Ok((engine, Loader::new(registry)))
}
