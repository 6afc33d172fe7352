//! Scaled TPC-C initial population.

use super::rand_util::{NuRandConstants, astring, nstring, nurand};
use crate::core::{DriverError, Result, Tuple, Value};
use crate::loader::Loader;
use crate::schema::{BAD_CREDIT, DISTRICTS_PER_WAREHOUSE, GOOD_CREDIT, ORIGINAL_STRING, Table};
use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

const SYLLABLES: [&str; 10] = [
    "BAR", "OUGHT", "ABLE", "PRI", "PRES", "ESE", "ANTI", "CALLY", "ATION", "EING",
];

/// Share of each district's initial orders left undelivered.
const NEW_ORDER_PERCENT: i64 = 30;

const INITIAL_W_YTD: f64 = 300_000.0;
const INITIAL_D_YTD: f64 = 30_000.0;
const INITIAL_H_AMOUNT: f64 = 10.0;

/// Builds the customer last name for `number` in `0..1000`.
pub fn last_name(number: i64) -> String {
    let number = number.rem_euclid(1000) as usize;
    [number / 100, (number / 10) % 10, number % 10]
        .iter()
        .map(|&digit| SYLLABLES[digit])
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleParameters {
    pub warehouses: i64,
    pub items: i64,
    pub customers_per_district: i64,
    pub orders_per_district: i64,
}

impl ScaleParameters {
    /// Full TPC-C cardinalities for `warehouses` warehouses.
    pub fn standard(warehouses: i64) -> Self {
        Self {
            warehouses,
            items: 100_000,
            customers_per_district: 3_000,
            orders_per_district: 3_000,
        }
    }

    /// A reduced population that loads in well under a second per warehouse.
    pub fn reduced(warehouses: i64) -> Self {
        Self {
            warehouses,
            items: 1_000,
            customers_per_district: 30,
            orders_per_district: 30,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.warehouses < 1
            || self.items < 1
            || self.customers_per_district < 1
            || self.orders_per_district < 1
        {
            return Err(DriverError::InvalidParameters(format!(
                "every scale parameter must be at least 1: {:?}",
                self
            )));
        }
        Ok(())
    }

    /// First order id of a district that still has a NewOrder marker after load.
    pub fn first_undelivered_order(&self) -> i64 {
        self.orders_per_district - self.orders_per_district * NEW_ORDER_PERCENT / 100 + 1
    }
}

/// Produces the initial rows of every table as positional tuples.
pub struct DatasetGenerator {
    scale: ScaleParameters,
    rng: SmallRng,
    constants: NuRandConstants,
    now: DateTime<Utc>,
}

impl DatasetGenerator {
    pub fn new(scale: ScaleParameters, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let constants = NuRandConstants::random(&mut rng);
        Self {
            scale,
            rng,
            constants,
            now: Utc::now(),
        }
    }

    pub fn scale(&self) -> ScaleParameters {
        self.scale
    }

    pub fn items(&mut self) -> Vec<Tuple> {
        (1..=self.scale.items)
            .map(|i_id| {
                vec![
                    Value::Integer(i_id),
                    Value::Integer(self.rng.gen_range(1..=10_000)),
                    Value::Text(astring(&mut self.rng, 14, 24)),
                    Value::Float(self.rng.gen_range(100..=10_000) as f64 / 100.0),
                    Value::Text(self.data_field()),
                ]
            })
            .collect()
    }

    pub fn warehouse(&mut self, w_id: i64) -> Vec<Tuple> {
        vec![vec![
            Value::Integer(w_id),
            Value::Text(astring(&mut self.rng, 6, 10)),
            Value::Text(astring(&mut self.rng, 10, 20)),
            Value::Text(astring(&mut self.rng, 10, 20)),
            Value::Text(astring(&mut self.rng, 10, 20)),
            Value::Text(astring(&mut self.rng, 2, 2)),
            Value::Text(self.zip()),
            Value::Float(self.tax()),
            Value::Float(INITIAL_W_YTD),
        ]]
    }

    pub fn districts(&mut self, w_id: i64) -> Vec<Tuple> {
        let next_o_id = self.scale.orders_per_district + 1;
        (1..=DISTRICTS_PER_WAREHOUSE)
            .map(|d_id| {
                vec![
                    Value::Integer(d_id),
                    Value::Integer(w_id),
                    Value::Text(astring(&mut self.rng, 6, 10)),
                    Value::Text(astring(&mut self.rng, 10, 20)),
                    Value::Text(astring(&mut self.rng, 10, 20)),
                    Value::Text(astring(&mut self.rng, 10, 20)),
                    Value::Text(astring(&mut self.rng, 2, 2)),
                    Value::Text(self.zip()),
                    Value::Float(self.tax()),
                    Value::Float(INITIAL_D_YTD),
                    Value::Integer(next_o_id),
                ]
            })
            .collect()
    }

    pub fn customers(&mut self, w_id: i64, d_id: i64) -> Vec<Tuple> {
        let customers = self.scale.customers_per_district;
        (1..=customers)
            .map(|c_id| {
                let c_last = if c_id <= 1000 {
                    last_name(c_id - 1)
                } else {
                    last_name(nurand(&mut self.rng, 255, 0, 999, self.constants.c_last))
                };
                let credit = if self.rng.gen_range(0..100) < 10 {
                    BAD_CREDIT
                } else {
                    GOOD_CREDIT
                };
                vec![
                    Value::Integer(c_id),
                    Value::Integer(d_id),
                    Value::Integer(w_id),
                    Value::Text(astring(&mut self.rng, 8, 16)),
                    Value::Text("OE".to_string()),
                    Value::Text(c_last),
                    Value::Text(astring(&mut self.rng, 10, 20)),
                    Value::Text(astring(&mut self.rng, 10, 20)),
                    Value::Text(astring(&mut self.rng, 10, 20)),
                    Value::Text(astring(&mut self.rng, 2, 2)),
                    Value::Text(self.zip()),
                    Value::Text(nstring(&mut self.rng, 16, 16)),
                    Value::Timestamp(self.now),
                    Value::Text(credit.to_string()),
                    Value::Float(50_000.0),
                    Value::Float(self.rng.gen_range(0..=5_000) as f64 / 10_000.0),
                    Value::Float(-10.0),
                    Value::Float(10.0),
                    Value::Integer(1),
                    Value::Integer(0),
                    Value::Text(astring(&mut self.rng, 300, 500)),
                ]
            })
            .collect()
    }

    pub fn history(&mut self, w_id: i64, d_id: i64) -> Vec<Tuple> {
        (1..=self.scale.customers_per_district)
            .map(|c_id| {
                vec![
                    Value::Integer(c_id),
                    Value::Integer(d_id),
                    Value::Integer(w_id),
                    Value::Integer(d_id),
                    Value::Integer(w_id),
                    Value::Timestamp(self.now),
                    Value::Float(INITIAL_H_AMOUNT),
                    Value::Text(astring(&mut self.rng, 12, 24)),
                ]
            })
            .collect()
    }

    pub fn stock(&mut self, w_id: i64) -> Vec<Tuple> {
        (1..=self.scale.items)
            .map(|i_id| {
                let mut tuple = vec![
                    Value::Integer(i_id),
                    Value::Integer(w_id),
                    Value::Integer(self.rng.gen_range(10..=100)),
                ];
                for _ in 0..DISTRICTS_PER_WAREHOUSE {
                    tuple.push(Value::Text(astring(&mut self.rng, 24, 24)));
                }
                tuple.extend([
                    Value::Integer(0),
                    Value::Integer(0),
                    Value::Integer(0),
                    Value::Text(self.data_field()),
                ]);
                tuple
            })
            .collect()
    }

    /// Orders, their lines, and the NewOrder markers of one district.
    pub fn orders(&mut self, w_id: i64, d_id: i64) -> (Vec<Tuple>, Vec<Tuple>, Vec<Tuple>) {
        let customers = self.scale.customers_per_district;
        let mut customer_ids: Vec<i64> = (1..=customers).collect();
        customer_ids.shuffle(&mut self.rng);
        let first_undelivered = self.scale.first_undelivered_order();

        let mut orders = Vec::new();
        let mut lines = Vec::new();
        let mut markers = Vec::new();
        for o_id in 1..=self.scale.orders_per_district {
            let delivered = o_id < first_undelivered;
            let c_id = customer_ids[((o_id - 1) % customers) as usize];
            let ol_cnt = self.rng.gen_range(5..=15);
            let carrier = if delivered {
                Value::Integer(self.rng.gen_range(1..=10))
            } else {
                Value::Null
            };
            orders.push(vec![
                Value::Integer(o_id),
                Value::Integer(c_id),
                Value::Integer(d_id),
                Value::Integer(w_id),
                Value::Timestamp(self.now),
                carrier,
                Value::Integer(ol_cnt),
                Value::Integer(1),
            ]);

            for ol_number in 1..=ol_cnt {
                let (delivery_d, amount) = if delivered {
                    (Value::Timestamp(self.now), 0.0)
                } else {
                    (Value::Null, self.rng.gen_range(1..=999_999) as f64 / 100.0)
                };
                lines.push(vec![
                    Value::Integer(o_id),
                    Value::Integer(d_id),
                    Value::Integer(w_id),
                    Value::Integer(ol_number),
                    Value::Integer(self.rng.gen_range(1..=self.scale.items)),
                    Value::Integer(w_id),
                    delivery_d,
                    Value::Integer(5),
                    Value::Float(amount),
                    Value::Text(astring(&mut self.rng, 24, 24)),
                ]);
            }

            if !delivered {
                markers.push(vec![
                    Value::Integer(o_id),
                    Value::Integer(d_id),
                    Value::Integer(w_id),
                ]);
            }
        }
        (orders, lines, markers)
    }

    fn data_field(&mut self) -> String {
        let mut data = astring(&mut self.rng, 26, 50);
        if self.rng.gen_range(0..100) < 10 {
            let at = self.rng.gen_range(0..=data.len() - ORIGINAL_STRING.len());
            data.replace_range(at..at + ORIGINAL_STRING.len(), ORIGINAL_STRING);
        }
        data
    }

    fn zip(&mut self) -> String {
        format!("{}11111", nstring(&mut self.rng, 4, 4))
    }

    fn tax(&mut self) -> f64 {
        self.rng.gen_range(0..=2_000) as f64 / 10_000.0
    }
}

/// Row counts written by [`load_dataset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub rows: Vec<(Table, usize)>,
}

impl LoadSummary {
    fn add(&mut self, table: Table, rows: usize) {
        match self.rows.iter_mut().find(|(t, _)| *t == table) {
            Some((_, total)) => *total += rows,
            None => self.rows.push((table, rows)),
        }
    }

    pub fn rows_for(&self, table: Table) -> usize {
        self.rows
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, rows)| *rows)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.rows.iter().map(|(_, rows)| rows).sum()
    }
}

/// Generates and loads a whole dataset, then finishes the load phase.
pub async fn load_dataset(loader: &Loader, scale: ScaleParameters, seed: u64) -> Result<LoadSummary> {
    scale.validate()?;
    let mut generator = DatasetGenerator::new(scale, seed);
    let mut summary = LoadSummary::default();

    let items = generator.items();
    summary.add(Table::Item, loader.load_tuples(Table::Item, items).await?);

    for w_id in 1..=scale.warehouses {
        let warehouse = generator.warehouse(w_id);
        summary.add(Table::Warehouse, loader.load_tuples(Table::Warehouse, warehouse).await?);
        let districts = generator.districts(w_id);
        summary.add(Table::District, loader.load_tuples(Table::District, districts).await?);
        let stock = generator.stock(w_id);
        summary.add(Table::Stock, loader.load_tuples(Table::Stock, stock).await?);

        for d_id in 1..=DISTRICTS_PER_WAREHOUSE {
            let customers = generator.customers(w_id, d_id);
            summary.add(Table::Customer, loader.load_tuples(Table::Customer, customers).await?);
            let history = generator.history(w_id, d_id);
            summary.add(Table::History, loader.load_tuples(Table::History, history).await?);

            let (orders, lines, markers) = generator.orders(w_id, d_id);
            summary.add(Table::Orders, loader.load_tuples(Table::Orders, orders).await?);
            summary.add(Table::OrderLine, loader.load_tuples(Table::OrderLine, lines).await?);
            summary.add(Table::NewOrder, loader.load_tuples(Table::NewOrder, markers).await?);
        }
        event!(Level::INFO, w_id, "warehouse loaded");
    }

    loader.load_finish().await?;
    Ok(summary)
}
