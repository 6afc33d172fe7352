//! Named parameter and result records of the five profiles.

use crate::core::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionKind {
    NewOrder,
    Payment,
    OrderStatus,
    Delivery,
    StockLevel,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 5] = [
        TransactionKind::NewOrder,
        TransactionKind::Payment,
        TransactionKind::OrderStatus,
        TransactionKind::Delivery,
        TransactionKind::StockLevel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TransactionKind::NewOrder => "NEW_ORDER",
            TransactionKind::Payment => "PAYMENT",
            TransactionKind::OrderStatus => "ORDER_STATUS",
            TransactionKind::Delivery => "DELIVERY",
            TransactionKind::StockLevel => "STOCK_LEVEL",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How Payment and OrderStatus pick their customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerSelector {
    ById(i64),
    /// Median-by-first-name among customers sharing this last name.
    ByLastName(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderParams {
    pub w_id: i64,
    pub d_id: i64,
    pub c_id: i64,
    pub o_entry_d: DateTime<Utc>,
    pub i_ids: Vec<i64>,
    pub i_w_ids: Vec<i64>,
    pub i_qtys: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentParams {
    pub w_id: i64,
    pub d_id: i64,
    pub h_amount: f64,
    pub c_w_id: i64,
    pub c_d_id: i64,
    pub customer: CustomerSelector,
    pub h_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusParams {
    pub w_id: i64,
    pub d_id: i64,
    pub customer: CustomerSelector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryParams {
    pub w_id: i64,
    pub o_carrier_id: i64,
    pub ol_delivery_d: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevelParams {
    pub w_id: i64,
    pub d_id: i64,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionParams {
    NewOrder(NewOrderParams),
    Payment(PaymentParams),
    OrderStatus(OrderStatusParams),
    Delivery(DeliveryParams),
    StockLevel(StockLevelParams),
}

impl TransactionParams {
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionParams::NewOrder(_) => TransactionKind::NewOrder,
            TransactionParams::Payment(_) => TransactionKind::Payment,
            TransactionParams::OrderStatus(_) => TransactionKind::OrderStatus,
            TransactionParams::Delivery(_) => TransactionKind::Delivery,
            TransactionParams::StockLevel(_) => TransactionKind::StockLevel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrderLineResult {
    pub i_id: i64,
    pub supply_w_id: i64,
    pub i_name: String,
    pub s_quantity: i64,
    /// `'B'` when both item and stock data carry the "ORIGINAL" marker, else `'G'`.
    pub brand_generic: char,
    pub i_price: f64,
    pub ol_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrderResult {
    pub customer: Record,
    pub o_id: i64,
    pub w_tax: f64,
    pub d_tax: f64,
    pub total: f64,
    pub lines: Vec<NewOrderLineResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentResult {
    pub warehouse: Record,
    pub district: Record,
    pub customer: Record,
    pub history_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStatusResult {
    pub customer: Record,
    pub order: Option<Record>,
    pub lines: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryResult {
    /// `(d_id, o_id)` for every district that had an undelivered order.
    pub delivered: Vec<(i64, i64)>,
    pub skipped: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLevelResult {
    pub next_o_id: i64,
    pub low_stock: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TransactionResult {
    NewOrder(NewOrderResult),
    Payment(PaymentResult),
    OrderStatus(OrderStatusResult),
    Delivery(DeliveryResult),
    StockLevel(StockLevelResult),
}
