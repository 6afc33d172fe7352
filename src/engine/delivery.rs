use super::{DeliveryParams, DeliveryResult, TransactionEngine, TxnOutcome};
use crate::core::Result;
use crate::schema::{DISTRICTS_PER_WAREHOUSE, Table};
use crate::view::{Direction, Filter, aggregate_sum, order_by};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{Instrument, Level, event, info_span};

/// Running count of district delivery attempts that found no pending order.
///
/// On a correctly loaded dataset the skip rate stays well under the
/// threshold; crossing it is logged at WARN once per excursion.
#[derive(Debug)]
pub struct DeliveryStats {
    attempts: AtomicU64,
    skipped: AtomicU64,
    threshold: f64,
    flagged: AtomicBool,
}

impl DeliveryStats {
    pub fn new(threshold: f64) -> Self {
        Self {
            attempts: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            threshold,
            flagged: AtomicBool::new(false),
        }
    }

    pub fn record(&self, attempts: u64, skipped: u64) {
        let total_attempts = self.attempts.fetch_add(attempts, Ordering::Relaxed) + attempts;
        let total_skipped = self.skipped.fetch_add(skipped, Ordering::Relaxed) + skipped;
        let rate = ratio(total_skipped, total_attempts);

        if rate > self.threshold {
            if !self.flagged.swap(true, Ordering::Relaxed) {
                event!(
                    Level::WARN,
                    skipped = total_skipped,
                    attempts = total_attempts,
                    rate,
                    threshold = self.threshold,
                    "delivery skip rate above threshold"
                );
            }
        } else {
            self.flagged.store(false, Ordering::Relaxed);
        }
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn skip_rate(&self) -> f64 {
        ratio(self.skipped(), self.attempts())
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn exceeds_threshold(&self) -> bool {
        self.skip_rate() > self.threshold
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl TransactionEngine {
    pub async fn delivery(&self, params: &DeliveryParams) -> Result<TxnOutcome<DeliveryResult>> {
        let span = info_span!("delivery", w_id = params.w_id, o_carrier_id = params.o_carrier_id);
        self.run_delivery(params).instrument(span).await
    }

    async fn run_delivery(&self, params: &DeliveryParams) -> Result<TxnOutcome<DeliveryResult>> {
        let w_id = params.w_id;
        let registry = self.registry();
        let new_order_view = registry.view(Table::NewOrder, w_id)?;
        let orders_view = registry.view(Table::Orders, w_id)?;
        let order_line_view = registry.view(Table::OrderLine, w_id)?;
        let customer_view = registry.view(Table::Customer, w_id)?;

        let mut result = DeliveryResult::default();
        for d_id in 1..=DISTRICTS_PER_WAREHOUSE {
            let markers = new_order_view
                .filter(&Filter::new().eq("NO_W_ID", w_id).eq("NO_D_ID", d_id))
                .await?;
            let Some(marker) = order_by(markers, "NO_O_ID", Direction::Ascending)?
                .into_iter()
                .next()
            else {
                event!(Level::DEBUG, d_id, "no undelivered order in district");
                result.skipped.push(d_id);
                continue;
            };
            let o_id = marker.record.i64("NO_O_ID")?;

            let order = orders_view.require(&[w_id, d_id, o_id]).await?;
            let c_id = order.record.i64("O_C_ID")?;

            let lines = order_line_view
                .filter(
                    &Filter::new()
                        .eq("OL_W_ID", w_id)
                        .eq("OL_D_ID", d_id)
                        .eq("OL_O_ID", o_id),
                )
                .await?;
            let context = format!("delivery of order {} in district {}:{}", o_id, w_id, d_id);
            let ol_total = aggregate_sum(&lines, "OL_AMOUNT")?.require_rows(
                Table::OrderLine,
                "OL_AMOUNT",
                &context,
            )?;

            new_order_view.delete(&marker.key).await?;

            let carrier = params.o_carrier_id;
            orders_view
                .update(&order.key, |o| {
                    o.set("O_CARRIER_ID", carrier);
                    Ok(())
                })
                .await?;

            let delivered_at = params.ol_delivery_d;
            for line in &lines {
                order_line_view
                    .update(&line.key, |ol| {
                        ol.set("OL_DELIVERY_D", delivered_at);
                        Ok(())
                    })
                    .await?;
            }

            let customer_key = Table::Customer.key(&[w_id, d_id, c_id])?;
            customer_view
                .update(&customer_key, |c| {
                    let balance = c.f64("C_BALANCE")?;
                    let delivery_cnt = c.i64("C_DELIVERY_CNT")?;
                    c.set("C_BALANCE", balance + ol_total);
                    c.set("C_DELIVERY_CNT", delivery_cnt + 1);
                    Ok(())
                })
                .await?;

            result.delivered.push((d_id, o_id));
        }

        self.delivery_stats
            .record(DISTRICTS_PER_WAREHOUSE as u64, result.skipped.len() as u64);
        self.commit(&[&new_order_view, &orders_view, &order_line_view, &customer_view])
            .await?;

        Ok(TxnOutcome::Completed(result))
    }
}

#[cfg(test)]
mod tests {
    use super::DeliveryStats;

    #[test]
    fn test_skip_rate_is_flagged_only_above_threshold() {
        let stats = DeliveryStats::new(0.01);
        assert_eq!(stats.skip_rate(), 0.0);

        stats.record(100, 1);
        assert!(!stats.exceeds_threshold());

        stats.record(100, 2);
        assert!(stats.exceeds_threshold());
        assert_eq!(stats.attempts(), 200);
        assert_eq!(stats.skipped(), 3);
    }
}
