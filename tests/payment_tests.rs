//! Payment profile: customer resolution, YTD bookkeeping, bad-credit data, history.

mod common;

use chrono::Utc;
use common::Fixture;
use tpcc_kv::engine::{CustomerSelector, PaymentParams};
use tpcc_kv::{DriverError, Table};

fn payment(w_id: i64, d_id: i64, c_w_id: i64, customer: CustomerSelector, h_amount: f64) -> PaymentParams {
    PaymentParams {
        w_id,
        d_id,
        h_amount,
        c_w_id,
        c_d_id: d_id,
        customer,
        h_date: Utc::now(),
    }
}

#[tokio::test]
async fn test_last_name_picks_median_by_first_name() {
    let fx = Fixture::seeded(&[1]).await;

    let result = fx
        .engine
        .payment(&payment(1, 2, 1, CustomerSelector::ByLastName("SMITH".into()), 5.0))
        .await
        .unwrap()
        .completed()
        .unwrap();

    // Amy, Bob, Cy -> index (3 - 1) / 2 = 1
    assert_eq!(result.customer.str("C_FIRST").unwrap(), "Bob");
    assert_eq!(result.customer.i64("C_ID").unwrap(), 3);
    assert_eq!(result.customer.i64("C_D_ID").unwrap(), 2);
}

#[tokio::test]
async fn test_median_with_even_match_count_takes_lower_middle() {
    let fx = Fixture::seeded(&[1]).await;
    let view = fx.registry.view(Table::Customer, 1).unwrap();
    // Rename Cy so only Amy and Bob remain SMITH in district 1.
    view.update(&Table::Customer.key(&[1, 1, 1]).unwrap(), |c| {
        c.set("C_LAST", "JONES");
        Ok(())
    })
    .await
    .unwrap();

    let result = fx
        .engine
        .payment(&payment(1, 1, 1, CustomerSelector::ByLastName("SMITH".into()), 5.0))
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(result.customer.str("C_FIRST").unwrap(), "Amy");

    let jones = fx
        .engine
        .payment(&payment(1, 1, 1, CustomerSelector::ByLastName("JONES".into()), 5.0))
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(jones.customer.str("C_FIRST").unwrap(), "Cy");
}

#[tokio::test]
async fn test_payment_updates_balances_and_history() {
    let fx = Fixture::seeded(&[1]).await;

    let result = fx
        .engine
        .payment(&payment(1, 1, 1, CustomerSelector::ById(2), 12.5))
        .await
        .unwrap()
        .completed()
        .unwrap();

    assert_eq!(result.warehouse.f64("W_YTD").unwrap(), 12.5);
    assert_eq!(result.district.f64("D_YTD").unwrap(), 12.5);

    let customer = fx.row(Table::Customer, 1, &[1, 1, 2]).await;
    assert_eq!(customer.f64("C_BALANCE").unwrap(), -12.5);
    assert_eq!(customer.f64("C_YTD_PAYMENT").unwrap(), 12.5);
    assert_eq!(customer.i64("C_PAYMENT_CNT").unwrap(), 1);
    assert_eq!(customer.str("C_DATA").unwrap(), "old data");

    let history = fx.all(Table::History, 1).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].key, result.history_key);
    let h = &history[0].record;
    assert_eq!(h.str("H_DATA").unwrap(), "WH1    D1");
    assert_eq!(h.i64("H_C_ID").unwrap(), 2);
    assert_eq!(h.f64("H_AMOUNT").unwrap(), 12.5);
}

#[tokio::test]
async fn test_bad_credit_customer_gets_audit_note() {
    let fx = Fixture::seeded(&[1]).await;

    fx.engine
        .payment(&payment(1, 4, 1, CustomerSelector::ById(1), 7.25))
        .await
        .unwrap();

    let customer = fx.row(Table::Customer, 1, &[1, 4, 1]).await;
    assert_eq!(customer.str("C_DATA").unwrap(), "1 4 1 4 1 7.25|old data");
}

#[tokio::test]
async fn test_remote_customer_lives_on_its_own_shard() {
    let fx = Fixture::seeded(&[1, 2]).await;

    fx.engine
        .payment(&payment(1, 1, 2, CustomerSelector::ById(3), 4.0))
        .await
        .unwrap();

    let remote = fx.row(Table::Customer, 2, &[2, 1, 3]).await;
    assert_eq!(remote.f64("C_BALANCE").unwrap(), -4.0);
    let local = fx.row(Table::Customer, 1, &[1, 1, 3]).await;
    assert_eq!(local.f64("C_BALANCE").unwrap(), 0.0);

    assert_eq!(fx.all(Table::History, 1).await.len(), 1);
    assert!(fx.all(Table::History, 2).await.is_empty());
    assert_eq!(fx.row(Table::Warehouse, 1, &[1]).await.f64("W_YTD").unwrap(), 4.0);
}

#[tokio::test]
async fn test_unknown_last_name_fails_without_writes() {
    let fx = Fixture::seeded(&[1]).await;

    let err = fx
        .engine
        .payment(&payment(1, 1, 1, CustomerSelector::ByLastName("NOBODY".into()), 3.0))
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::CustomerNotFound { w_id: 1, d_id: 1, .. }));
    assert!(!err.is_infrastructure());
    assert_eq!(fx.row(Table::Warehouse, 1, &[1]).await.f64("W_YTD").unwrap(), 0.0);
    assert!(fx.all(Table::History, 1).await.is_empty());
}
