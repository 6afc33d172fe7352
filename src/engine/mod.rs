//! The five TPC-C transaction profiles as procedures over [`RelationalView`]s.
//!
//! None of the profiles is a transaction in the ACID sense. Each one applies
//! its writes as an ordered sequence of independent `put`s with no locking, so:
//!
//! * two concurrent NewOrders on one district can read the same
//!   `D_NEXT_O_ID` and both write the same order id;
//! * a profile that fails half-way (for instance on `StoreUnavailable`)
//!   leaves its earlier writes in place. There is no rollback.

mod delivery;
mod new_order;
mod order_status;
pub mod outcome;
pub mod params;
mod payment;
mod stock_level;

use crate::connection::config::DriverConfig;
use crate::core::{DriverError, KeyedRecord, Result};
use crate::routing::ShardRegistry;
use crate::schema::Table;
use crate::view::{Direction, Filter, RelationalView, order_by};
use std::sync::Arc;

pub use delivery::DeliveryStats;
pub use new_order::restock;
pub use outcome::{AbortReason, TxnOutcome};
pub use params::{
    CustomerSelector, DeliveryParams, DeliveryResult, NewOrderLineResult, NewOrderParams,
    NewOrderResult, OrderStatusParams, OrderStatusResult, PaymentParams, PaymentResult,
    StockLevelParams, StockLevelResult, TransactionKind, TransactionParams, TransactionResult,
};

const DEFAULT_SKIP_THRESHOLD: f64 = 0.01;

pub struct TransactionEngine {
    registry: Arc<ShardRegistry>,
    sync_on_commit: bool,
    delivery_stats: DeliveryStats,
}

impl TransactionEngine {
    pub fn new(registry: Arc<ShardRegistry>) -> Self {
        Self {
            registry,
            sync_on_commit: false,
            delivery_stats: DeliveryStats::new(DEFAULT_SKIP_THRESHOLD),
        }
    }

    pub fn from_config(registry: Arc<ShardRegistry>, config: &DriverConfig) -> Self {
        Self {
            registry,
            sync_on_commit: config.sync_on_commit,
            delivery_stats: DeliveryStats::new(config.delivery_skip_threshold),
        }
    }

    pub fn sync_on_commit(mut self, enabled: bool) -> Self {
        self.sync_on_commit = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<ShardRegistry> {
        &self.registry
    }

    pub fn delivery_stats(&self) -> &DeliveryStats {
        &self.delivery_stats
    }

    /// Runs whichever profile `params` describes.
    pub async fn execute(&self, params: &TransactionParams) -> Result<TxnOutcome<TransactionResult>> {
        Ok(match params {
            TransactionParams::NewOrder(p) => {
                self.new_order(p).await?.map(TransactionResult::NewOrder)
            }
            TransactionParams::Payment(p) => {
                self.payment(p).await?.map(TransactionResult::Payment)
            }
            TransactionParams::OrderStatus(p) => {
                self.order_status(p).await?.map(TransactionResult::OrderStatus)
            }
            TransactionParams::Delivery(p) => {
                self.delivery(p).await?.map(TransactionResult::Delivery)
            }
            TransactionParams::StockLevel(p) => {
                self.stock_level(p).await?.map(TransactionResult::StockLevel)
            }
        })
    }

    /// Finds the customer a Payment or OrderStatus refers to.
    ///
    /// By last name, the matches are sorted by `C_FIRST` and the one at
    /// position `(n - 1) / 2` is taken.
    pub(crate) async fn resolve_customer(
        &self,
        w_id: i64,
        d_id: i64,
        selector: &CustomerSelector,
    ) -> Result<(RelationalView, KeyedRecord)> {
        let view = self.registry.view(Table::Customer, w_id)?;
        let customer = match selector {
            CustomerSelector::ById(c_id) => view.require(&[w_id, d_id, *c_id]).await?,
            CustomerSelector::ByLastName(c_last) => {
                let matches = view
                    .filter(
                        &Filter::new()
                            .eq("C_W_ID", w_id)
                            .eq("C_D_ID", d_id)
                            .eq("C_LAST", c_last.as_str()),
                    )
                    .await?;
                let mut sorted = order_by(matches, "C_FIRST", Direction::Ascending)?;
                if sorted.is_empty() {
                    return Err(DriverError::CustomerNotFound {
                        w_id,
                        d_id,
                        c_last: c_last.clone(),
                    });
                }
                let index = (sorted.len() - 1) / 2;
                sorted.swap_remove(index)
            }
        };
        Ok((view, customer))
    }

    /// Flushes every view a profile wrote to, when `sync_on_commit` is set.
    pub(crate) async fn commit(&self, written: &[&RelationalView]) -> Result<()> {
        if !self.sync_on_commit {
            return Ok(());
        }
        let mut synced: Vec<String> = Vec::with_capacity(written.len());
        for view in written {
            let endpoint = view.client().endpoint();
            if synced.contains(&endpoint) {
                continue;
            }
            view.client().sync().await?;
            synced.push(endpoint);
        }
        Ok(())
    }
}
