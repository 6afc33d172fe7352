use super::{PaymentParams, PaymentResult, TransactionEngine, TxnOutcome};
use crate::core::{Record, Result};
use crate::schema::{BAD_CREDIT, MAX_C_DATA, Table};
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

impl TransactionEngine {
    pub async fn payment(&self, params: &PaymentParams) -> Result<TxnOutcome<PaymentResult>> {
        let span = info_span!("payment", w_id = params.w_id, d_id = params.d_id, c_w_id = params.c_w_id);
        self.run_payment(params).instrument(span).await
    }

    async fn run_payment(&self, params: &PaymentParams) -> Result<TxnOutcome<PaymentResult>> {
        let (w_id, d_id, h_amount) = (params.w_id, params.d_id, params.h_amount);
        let registry = self.registry();

        // Resolve first so an unknown last name fails before any write.
        let (customer_view, customer) = self
            .resolve_customer(params.c_w_id, params.c_d_id, &params.customer)
            .await?;
        let c_id = customer.record.i64("C_ID")?;

        let warehouse_view = registry.view(Table::Warehouse, w_id)?;
        let warehouse_key = Table::Warehouse.key(&[w_id])?;
        let warehouse = warehouse_view
            .update(&warehouse_key, |w| {
                let ytd = w.f64("W_YTD")?;
                w.set("W_YTD", ytd + h_amount);
                Ok(())
            })
            .await?;

        let district_view = registry.view(Table::District, w_id)?;
        let district_key = Table::District.key(&[w_id, d_id])?;
        let district = district_view
            .update(&district_key, |d| {
                let ytd = d.f64("D_YTD")?;
                d.set("D_YTD", ytd + h_amount);
                Ok(())
            })
            .await?;

        let bad_credit = customer.record.str("C_CREDIT")? == BAD_CREDIT;
        let audit = format!(
            "{} {} {} {} {} {}",
            c_id, params.c_d_id, params.c_w_id, d_id, w_id, h_amount
        );
        let customer = customer_view
            .update(&customer.key, |c| {
                let balance = c.f64("C_BALANCE")?;
                let ytd_payment = c.f64("C_YTD_PAYMENT")?;
                let payment_cnt = c.i64("C_PAYMENT_CNT")?;
                c.set("C_BALANCE", balance - h_amount);
                c.set("C_YTD_PAYMENT", ytd_payment + h_amount);
                c.set("C_PAYMENT_CNT", payment_cnt + 1);
                if bad_credit {
                    let data = prepend_audit(&audit, c.str("C_DATA")?);
                    c.set("C_DATA", data);
                }
                Ok(())
            })
            .await?;

        let h_data = format!(
            "{}    {}",
            warehouse.str("W_NAME")?,
            district.str("D_NAME")?
        );
        let history_view = registry.view(Table::History, w_id)?;
        let history_key = Uuid::new_v4().to_string();
        history_view
            .put_keyed(
                &history_key,
                Record::new()
                    .with("H_C_ID", c_id)
                    .with("H_C_D_ID", params.c_d_id)
                    .with("H_C_W_ID", params.c_w_id)
                    .with("H_D_ID", d_id)
                    .with("H_W_ID", w_id)
                    .with("H_DATE", params.h_date)
                    .with("H_AMOUNT", h_amount)
                    .with("H_DATA", h_data),
            )
            .await?;

        self.commit(&[&warehouse_view, &district_view, &customer_view, &history_view])
            .await?;

        event!(Level::DEBUG, c_id, bad_credit, "payment completed");
        Ok(TxnOutcome::Completed(PaymentResult {
            warehouse,
            district,
            customer,
            history_key,
        }))
    }
}

/// `note|old`, cut to the stored `C_DATA` length.
fn prepend_audit(note: &str, old: &str) -> String {
    format!("{}|{}", note, old).chars().take(MAX_C_DATA).collect()
}
