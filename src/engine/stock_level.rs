use super::{StockLevelParams, StockLevelResult, TransactionEngine, TxnOutcome};
use crate::core::Result;
use crate::schema::{STOCK_LEVEL_ORDERS, Table};
use crate::view::Filter;
use std::collections::BTreeSet;
use tracing::{Instrument, Level, event, info_span};

impl TransactionEngine {
    pub async fn stock_level(&self, params: &StockLevelParams) -> Result<TxnOutcome<StockLevelResult>> {
        let span = info_span!("stock_level", w_id = params.w_id, d_id = params.d_id);
        self.run_stock_level(params).instrument(span).await
    }

    async fn run_stock_level(&self, params: &StockLevelParams) -> Result<TxnOutcome<StockLevelResult>> {
        let (w_id, d_id) = (params.w_id, params.d_id);
        let registry = self.registry();

        let district = registry
            .view(Table::District, w_id)?
            .require(&[w_id, d_id])
            .await?;
        let next_o_id = district.record.i64("D_NEXT_O_ID")?;

        let lines = registry
            .view(Table::OrderLine, w_id)?
            .filter(
                &Filter::new()
                    .eq("OL_W_ID", w_id)
                    .eq("OL_D_ID", d_id)
                    .range("OL_O_ID", next_o_id - STOCK_LEVEL_ORDERS, next_o_id),
            )
            .await?;

        let item_ids = lines
            .iter()
            .map(|line| line.record.i64("OL_I_ID"))
            .collect::<Result<BTreeSet<i64>>>()?;

        let stock_view = registry.view(Table::Stock, w_id)?;
        let mut low_stock = 0;
        for i_id in &item_ids {
            let hits = stock_view
                .filter(
                    &Filter::new()
                        .eq("S_W_ID", w_id)
                        .eq("S_I_ID", *i_id)
                        .lt("S_QUANTITY", params.threshold),
                )
                .await?;
            if !hits.is_empty() {
                low_stock += 1;
            }
        }

        event!(
            Level::DEBUG,
            next_o_id,
            items = item_ids.len(),
            low_stock,
            "stock level computed"
        );
        Ok(TxnOutcome::Completed(StockLevelResult {
            next_o_id,
            low_stock,
        }))
    }
}
