//! Random transaction parameters following the TPC-C input rules.

use super::generator::{ScaleParameters, last_name};
use super::rand_util::{NuRandConstants, nurand};
use crate::engine::{
    CustomerSelector, DeliveryParams, NewOrderParams, OrderStatusParams, PaymentParams,
    StockLevelParams, TransactionKind, TransactionParams,
};
use crate::schema::DISTRICTS_PER_WAREHOUSE;
use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Percent of NewOrders that reference a nonexistent item.
const INVALID_ITEM_PERCENT: u32 = 1;
/// Percent of order lines supplied by another warehouse.
const REMOTE_LINE_PERCENT: u32 = 1;
/// Percent of Payments made by a customer of another warehouse.
const REMOTE_PAYMENT_PERCENT: u32 = 15;
/// Percent of Payments/OrderStatus selecting the customer by last name.
const BY_LAST_NAME_PERCENT: u32 = 60;

pub struct ParameterGenerator {
    scale: ScaleParameters,
    rng: SmallRng,
    constants: NuRandConstants,
}

impl ParameterGenerator {
    pub fn new(scale: ScaleParameters, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let constants = NuRandConstants::random(&mut rng);
        Self {
            scale,
            rng,
            constants,
        }
    }

    /// Draws the next transaction of the standard 45/43/4/4/4 mix.
    pub fn next_transaction(&mut self) -> TransactionParams {
        match self.next_kind() {
            TransactionKind::NewOrder => TransactionParams::NewOrder(self.new_order()),
            TransactionKind::Payment => TransactionParams::Payment(self.payment()),
            TransactionKind::OrderStatus => TransactionParams::OrderStatus(self.order_status()),
            TransactionKind::Delivery => TransactionParams::Delivery(self.delivery()),
            TransactionKind::StockLevel => TransactionParams::StockLevel(self.stock_level()),
        }
    }

    pub fn next_kind(&mut self) -> TransactionKind {
        match self.rng.gen_range(0..100u32) {
            0..=3 => TransactionKind::StockLevel,
            4..=7 => TransactionKind::Delivery,
            8..=11 => TransactionKind::OrderStatus,
            12..=54 => TransactionKind::Payment,
            _ => TransactionKind::NewOrder,
        }
    }

    pub fn new_order(&mut self) -> NewOrderParams {
        let w_id = self.warehouse_id();
        let d_id = self.district_id();
        let c_id = self.customer_id();
        let ol_cnt = self.rng.gen_range(5..=15usize);
        let rollback = self.percent(INVALID_ITEM_PERCENT);

        let mut i_ids = Vec::with_capacity(ol_cnt);
        let mut i_w_ids = Vec::with_capacity(ol_cnt);
        let mut i_qtys = Vec::with_capacity(ol_cnt);
        for line in 0..ol_cnt {
            let i_id = if rollback && line + 1 == ol_cnt {
                self.scale.items + 1
            } else {
                self.item_id()
            };
            let supply = if self.scale.warehouses > 1 && self.percent(REMOTE_LINE_PERCENT) {
                self.other_warehouse(w_id)
            } else {
                w_id
            };
            i_ids.push(i_id);
            i_w_ids.push(supply);
            i_qtys.push(self.rng.gen_range(1..=10));
        }

        NewOrderParams {
            w_id,
            d_id,
            c_id,
            o_entry_d: Utc::now(),
            i_ids,
            i_w_ids,
            i_qtys,
        }
    }

    pub fn payment(&mut self) -> PaymentParams {
        let w_id = self.warehouse_id();
        let d_id = self.district_id();
        let (c_w_id, c_d_id) =
            if self.scale.warehouses > 1 && self.percent(REMOTE_PAYMENT_PERCENT) {
                (self.other_warehouse(w_id), self.district_id())
            } else {
                (w_id, d_id)
            };
        PaymentParams {
            w_id,
            d_id,
            h_amount: self.rng.gen_range(100..=500_000) as f64 / 100.0,
            c_w_id,
            c_d_id,
            customer: self.customer_selector(),
            h_date: Utc::now(),
        }
    }

    pub fn order_status(&mut self) -> OrderStatusParams {
        OrderStatusParams {
            w_id: self.warehouse_id(),
            d_id: self.district_id(),
            customer: self.customer_selector(),
        }
    }

    pub fn delivery(&mut self) -> DeliveryParams {
        DeliveryParams {
            w_id: self.warehouse_id(),
            o_carrier_id: self.rng.gen_range(1..=10),
            ol_delivery_d: Utc::now(),
        }
    }

    pub fn stock_level(&mut self) -> StockLevelParams {
        StockLevelParams {
            w_id: self.warehouse_id(),
            d_id: self.district_id(),
            threshold: self.rng.gen_range(10..=20),
        }
    }

    fn percent(&mut self, pct: u32) -> bool {
        self.rng.gen_range(0..100u32) < pct
    }

    fn warehouse_id(&mut self) -> i64 {
        self.rng.gen_range(1..=self.scale.warehouses)
    }

    fn other_warehouse(&mut self, w_id: i64) -> i64 {
        let other = self.rng.gen_range(1..self.scale.warehouses);
        if other >= w_id { other + 1 } else { other }
    }

    fn district_id(&mut self) -> i64 {
        self.rng.gen_range(1..=DISTRICTS_PER_WAREHOUSE)
    }

    fn customer_id(&mut self) -> i64 {
        nurand(
            &mut self.rng,
            1023,
            1,
            self.scale.customers_per_district,
            self.constants.c_id,
        )
    }

    fn item_id(&mut self) -> i64 {
        nurand(&mut self.rng, 8191, 1, self.scale.items, self.constants.ol_i_id)
    }

    /// A last name is only drawn from the numbers actually assigned at load.
    fn customer_selector(&mut self) -> CustomerSelector {
        if self.percent(BY_LAST_NAME_PERCENT) {
            let names = self.scale.customers_per_district.min(1000);
            let number = if names == 1000 {
                nurand(&mut self.rng, 255, 0, 999, self.constants.c_last)
            } else {
                self.rng.gen_range(0..names)
            };
            CustomerSelector::ByLastName(last_name(number))
        } else {
            CustomerSelector::ById(self.customer_id())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_and_bounds() {
        let scale = ScaleParameters::reduced(2);
        let mut generator = ParameterGenerator::new(scale, 42);
        let mut invalid = 0;
        let mut new_orders = 0;
        for _ in 0..5_000 {
            match generator.next_transaction() {
                TransactionParams::NewOrder(p) => {
                    new_orders += 1;
                    assert!((5..=15).contains(&p.i_ids.len()));
                    assert_eq!(p.i_ids.len(), p.i_qtys.len());
                    assert!(p.i_w_ids.iter().all(|w| (1..=2).contains(w)));
                    if p.i_ids.iter().any(|&i| i > scale.items) {
                        invalid += 1;
                    }
                }
                TransactionParams::Payment(p) => {
                    assert!((1.0..=5000.0).contains(&p.h_amount));
                    if let CustomerSelector::ById(c_id) = p.customer {
                        assert!((1..=scale.customers_per_district).contains(&c_id));
                    }
                }
                TransactionParams::StockLevel(p) => assert!((10..=20).contains(&p.threshold)),
                _ => {}
            }
        }
        assert!(new_orders > 2_000 && new_orders < 2_500);
        assert!(invalid > 0 && invalid < new_orders / 20);
    }
}
