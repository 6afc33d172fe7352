use super::{
    AbortReason, NewOrderLineResult, NewOrderParams, NewOrderResult, TransactionEngine, TxnOutcome,
};
use crate::core::{DriverError, KeyedRecord, Record, Result, Value};
use crate::schema::{ORIGINAL_STRING, Table};
use crate::view::RelationalView;
use tracing::{Instrument, Level, event, info_span};

/// Stock quantity after `ol_quantity` units are taken from `s_quantity`.
///
/// Refills by 91 when the shelf would drop below 10 units.
pub fn restock(s_quantity: i64, ol_quantity: i64) -> i64 {
    if s_quantity >= ol_quantity + 10 {
        s_quantity - ol_quantity
    } else {
        s_quantity + 91 - ol_quantity
    }
}

/// An order line whose item and stock rows were both found.
struct SuppliedLine {
    i_id: i64,
    item: KeyedRecord,
    stock: KeyedRecord,
    stock_view: RelationalView,
    supply_w_id: i64,
    ol_quantity: i64,
}

impl TransactionEngine {
    pub async fn new_order(&self, params: &NewOrderParams) -> Result<TxnOutcome<NewOrderResult>> {
        let span = info_span!("new_order", w_id = params.w_id, d_id = params.d_id, c_id = params.c_id);
        self.run_new_order(params).instrument(span).await
    }

    async fn run_new_order(&self, params: &NewOrderParams) -> Result<TxnOutcome<NewOrderResult>> {
        let line_count = params.i_ids.len();
        if line_count == 0 || params.i_w_ids.len() != line_count || params.i_qtys.len() != line_count {
            return Err(DriverError::InvalidParameters(format!(
                "new order needs matching non-empty item lists, got {} ids, {} warehouses, {} quantities",
                line_count,
                params.i_w_ids.len(),
                params.i_qtys.len()
            )));
        }

        let (w_id, d_id, c_id) = (params.w_id, params.d_id, params.c_id);
        let registry = self.registry();

        // Every item must exist before anything is written.
        let item_view = registry.view(Table::Item, w_id)?;
        let mut items: Vec<KeyedRecord> = Vec::with_capacity(line_count);
        for &i_id in &params.i_ids {
            match item_view.get(&[i_id]).await? {
                Some(item) => items.push(item),
                None => {
                    event!(Level::DEBUG, i_id, "new order aborted on invalid item");
                    return Ok(TxnOutcome::Aborted(AbortReason::InvalidItem { i_id }));
                }
            }
        }

        // Stock is read up front too, so the stored order only counts lines
        // that will actually be written.
        let mut supplied = Vec::with_capacity(line_count);
        for (index, item) in items.into_iter().enumerate() {
            let (i_id, supply_w_id) = (params.i_ids[index], params.i_w_ids[index]);
            let stock_view = registry.view(Table::Stock, supply_w_id)?;
            match stock_view.get(&[supply_w_id, i_id]).await? {
                Some(stock) => supplied.push(SuppliedLine {
                    i_id,
                    item,
                    stock,
                    stock_view,
                    supply_w_id,
                    ol_quantity: params.i_qtys[index],
                }),
                None => {
                    event!(Level::WARN, i_id, supply_w_id, "no stock row, skipping order line");
                }
            }
        }
        if supplied.is_empty() {
            return Err(DriverError::MissingRow {
                table: Table::Stock.name().to_string(),
                key: format!("no stock for any of items {:?}", params.i_ids),
            });
        }

        let warehouse = registry.view(Table::Warehouse, w_id)?.require(&[w_id]).await?;
        let w_tax = warehouse.record.f64("W_TAX")?;

        let district_view = registry.view(Table::District, w_id)?;
        let district = district_view.require(&[w_id, d_id]).await?;
        let d_tax = district.record.f64("D_TAX")?;
        let o_id = district.record.i64("D_NEXT_O_ID")?;

        let customer = registry
            .view(Table::Customer, w_id)?
            .require(&[w_id, d_id, c_id])
            .await?;
        let c_discount = customer.record.f64("C_DISCOUNT")?;

        let mut next = district.record;
        next.set("D_NEXT_O_ID", o_id + 1);
        district_view.put_keyed(&district.key, next).await?;

        let all_local = supplied.iter().all(|line| line.supply_w_id == w_id);
        let orders_view = registry.view(Table::Orders, w_id)?;
        orders_view
            .put(
                Record::new()
                    .with("O_ID", o_id)
                    .with("O_C_ID", c_id)
                    .with("O_D_ID", d_id)
                    .with("O_W_ID", w_id)
                    .with("O_ENTRY_D", params.o_entry_d)
                    .with("O_CARRIER_ID", Value::Null)
                    .with("O_OL_CNT", supplied.len() as i64)
                    .with("O_ALL_LOCAL", i64::from(all_local)),
            )
            .await?;

        let new_order_view = registry.view(Table::NewOrder, w_id)?;
        new_order_view
            .put(
                Record::new()
                    .with("NO_O_ID", o_id)
                    .with("NO_D_ID", d_id)
                    .with("NO_W_ID", w_id),
            )
            .await?;

        let order_line_view = registry.view(Table::OrderLine, w_id)?;
        let dist_column = format!("S_DIST_{:02}", d_id);
        let mut lines = Vec::with_capacity(supplied.len());
        let mut subtotal = 0.0;

        for (index, line) in supplied.iter().enumerate() {
            let SuppliedLine {
                i_id,
                item,
                stock,
                stock_view,
                supply_w_id,
                ol_quantity,
            } = line;
            let (i_id, supply_w_id, ol_quantity) = (*i_id, *supply_w_id, *ol_quantity);
            let ol_number = index as i64 + 1;

            let s_quantity = restock(stock.record.i64("S_QUANTITY")?, ol_quantity);
            let remote = supply_w_id != w_id;
            let mut updated = stock.record.clone();
            updated.set("S_QUANTITY", s_quantity);
            updated.set("S_YTD", stock.record.i64("S_YTD")? + ol_quantity);
            updated.set("S_ORDER_CNT", stock.record.i64("S_ORDER_CNT")? + 1);
            if remote {
                updated.set("S_REMOTE_CNT", stock.record.i64("S_REMOTE_CNT")? + 1);
            }
            stock_view.put_keyed(&stock.key, updated).await?;

            let i_price = item.record.f64("I_PRICE")?;
            let ol_amount = ol_quantity as f64 * i_price;
            subtotal += ol_amount;

            let brand_generic = if item.record.str("I_DATA")?.contains(ORIGINAL_STRING)
                && stock.record.str("S_DATA")?.contains(ORIGINAL_STRING)
            {
                'B'
            } else {
                'G'
            };

            order_line_view
                .put(
                    Record::new()
                        .with("OL_O_ID", o_id)
                        .with("OL_D_ID", d_id)
                        .with("OL_W_ID", w_id)
                        .with("OL_NUMBER", ol_number)
                        .with("OL_I_ID", i_id)
                        .with("OL_SUPPLY_W_ID", supply_w_id)
                        .with("OL_DELIVERY_D", Value::Null)
                        .with("OL_QUANTITY", ol_quantity)
                        .with("OL_AMOUNT", ol_amount)
                        .with("OL_DIST_INFO", stock.record.value(&dist_column)?.clone()),
                )
                .await?;

            lines.push(NewOrderLineResult {
                i_id,
                supply_w_id,
                i_name: item.record.str("I_NAME")?.to_string(),
                s_quantity,
                brand_generic,
                i_price,
                ol_amount,
            });
        }

        let total = subtotal * (1.0 - c_discount) * (1.0 + w_tax + d_tax);

        let mut written = vec![&district_view, &orders_view, &new_order_view, &order_line_view];
        written.extend(supplied.iter().map(|line| &line.stock_view));
        self.commit(&written).await?;

        event!(Level::DEBUG, o_id, lines = lines.len(), total, "new order completed");
        Ok(TxnOutcome::Completed(NewOrderResult {
            customer: customer.record.project(&["C_DISCOUNT", "C_LAST", "C_CREDIT"]),
            o_id,
            w_tax,
            d_tax,
            total,
            lines,
        }))
    }
}
