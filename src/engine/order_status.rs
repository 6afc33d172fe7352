use super::{OrderStatusParams, OrderStatusResult, TransactionEngine, TxnOutcome};
use crate::core::Result;
use crate::schema::Table;
use crate::view::{Direction, Filter, order_by};
use tracing::{Instrument, info_span};

impl TransactionEngine {
    pub async fn order_status(&self, params: &OrderStatusParams) -> Result<TxnOutcome<OrderStatusResult>> {
        let span = info_span!("order_status", w_id = params.w_id, d_id = params.d_id);
        self.run_order_status(params).instrument(span).await
    }

    async fn run_order_status(&self, params: &OrderStatusParams) -> Result<TxnOutcome<OrderStatusResult>> {
        let (w_id, d_id) = (params.w_id, params.d_id);
        let registry = self.registry();

        let (_, customer) = self.resolve_customer(w_id, d_id, &params.customer).await?;
        let c_id = customer.record.i64("C_ID")?;

        let orders = registry
            .view(Table::Orders, w_id)?
            .filter(
                &Filter::new()
                    .eq("O_W_ID", w_id)
                    .eq("O_D_ID", d_id)
                    .eq("O_C_ID", c_id),
            )
            .await?;
        // Newest order is the one with the greatest O_ID.
        let newest = order_by(orders, "O_ID", Direction::Descending)?.into_iter().next();

        let customer = customer
            .record
            .project(&["C_ID", "C_FIRST", "C_MIDDLE", "C_LAST", "C_BALANCE"]);
        let Some(order) = newest else {
            return Ok(TxnOutcome::Completed(OrderStatusResult {
                customer,
                order: None,
                lines: Vec::new(),
            }));
        };

        let o_id = order.record.i64("O_ID")?;
        let lines = registry
            .view(Table::OrderLine, w_id)?
            .filter(
                &Filter::new()
                    .eq("OL_W_ID", w_id)
                    .eq("OL_D_ID", d_id)
                    .eq("OL_O_ID", o_id),
            )
            .await?;
        let lines = order_by(lines, "OL_NUMBER", Direction::Ascending)?
            .into_iter()
            .map(|line| {
                line.record.project(&[
                    "OL_SUPPLY_W_ID",
                    "OL_I_ID",
                    "OL_QUANTITY",
                    "OL_AMOUNT",
                    "OL_DELIVERY_D",
                ])
            })
            .collect();

        Ok(TxnOutcome::Completed(OrderStatusResult {
            customer,
            order: Some(order.record.project(&["O_ID", "O_CARRIER_ID", "O_ENTRY_D"])),
            lines,
        }))
    }
}
