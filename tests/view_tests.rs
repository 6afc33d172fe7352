//! Relational view: access path planning, residual filtering, index upkeep.

mod common;

use common::Fixture;
use tpcc_kv::view::{AccessPath, Filter};
use tpcc_kv::{DriverError, Table};

#[tokio::test]
async fn test_fully_bound_key_is_a_point_lookup() {
    let fx = Fixture::seeded(&[1]).await;
    let view = fx.registry.view(Table::Customer, 1).unwrap();

    let filter = Filter::new()
        .eq("C_W_ID", 1i64)
        .eq("C_D_ID", 2i64)
        .eq("C_ID", 3i64);
    let path = view.plan(&filter).await.unwrap();

    assert_eq!(path, AccessPath::Point(Table::Customer.key(&[1, 2, 3]).unwrap()));
    let rows = view.filter(&filter).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record.str("C_FIRST").unwrap(), "Bob");
}

#[tokio::test]
async fn test_indexed_column_uses_the_index() {
    let fx = Fixture::seeded(&[1]).await;
    let view = fx.registry.view(Table::Customer, 1).unwrap();

    let filter = Filter::new()
        .eq("C_W_ID", 1i64)
        .eq("C_D_ID", 4i64)
        .eq("C_LAST", "SMITH");
    assert_eq!(
        view.plan(&filter).await.unwrap(),
        AccessPath::Index {
            column: "C_LAST".to_string(),
            prefix: Table::Customer.prefix(&[1, 4]).unwrap(),
        }
    );

    let rows = view.filter(&filter).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.record.i64("C_D_ID").unwrap() == 4));
}

#[tokio::test]
async fn test_last_name_lookup_reads_only_the_bound_district() {
    let fx = Fixture::seeded(&[1]).await;
    let view = fx.registry.view(Table::Customer, 1).unwrap();
    let store = fx.store(1, Table::Customer);

    // Every district holds three SMITHs; only district 1's are fetched.
    let before = store.operation_count();
    let rows = view
        .filter(&Filter::new().eq("C_W_ID", 1i64).eq("C_D_ID", 1i64).eq("C_LAST", "SMITH"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(store.operation_count() - before, 3);
}

#[tokio::test]
async fn test_small_range_fans_out() {
    let fx = Fixture::empty(&[1]);
    let lines = fx.registry.view(Table::OrderLine, 1).unwrap();
    let orders = fx.registry.view(Table::Orders, 1).unwrap();

    let path = lines
        .plan(&Filter::new().eq("OL_W_ID", 1i64).eq("OL_D_ID", 2i64).range("OL_O_ID", 3, 5))
        .await
        .unwrap();
    assert_eq!(
        path,
        AccessPath::Prefixes(vec![
            Table::OrderLine.prefix(&[1, 2, 3]).unwrap(),
            Table::OrderLine.prefix(&[1, 2, 4]).unwrap(),
        ])
    );

    let path = orders
        .plan(&Filter::new().eq("O_W_ID", 1i64).eq("O_D_ID", 2i64).range("O_ID", 7, 9))
        .await
        .unwrap();
    assert_eq!(
        path,
        AccessPath::Points(vec![
            Table::Orders.key(&[1, 2, 7]).unwrap(),
            Table::Orders.key(&[1, 2, 8]).unwrap(),
        ])
    );
}

#[tokio::test]
async fn test_wide_range_falls_back_to_prefix() {
    let fx = Fixture::empty(&[1]);
    let lines = fx.registry.view(Table::OrderLine, 1).unwrap();

    let path = lines
        .plan(&Filter::new().eq("OL_W_ID", 1i64).eq("OL_D_ID", 2i64).range("OL_O_ID", 1, 500))
        .await
        .unwrap();

    assert_eq!(
        path,
        AccessPath::Prefixes(vec![Table::OrderLine.prefix(&[1, 2]).unwrap()])
    );
}

#[tokio::test]
async fn test_partition_only_filter_scans_the_warehouse_prefix() {
    let fx = Fixture::seeded(&[1]).await;
    let stock = fx.registry.view(Table::Stock, 1).unwrap();

    let filter = Filter::new().eq("S_W_ID", 1i64).lt("S_QUANTITY", 60i64);
    assert_eq!(
        stock.plan(&filter).await.unwrap(),
        AccessPath::Prefixes(vec![Table::Stock.prefix(&[1]).unwrap()])
    );
    assert_eq!(stock.filter(&filter).await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_full_scan_requires_opt_in() {
    let fx = Fixture::seeded(&[1]).await;
    let stock = fx.registry.view(Table::Stock, 1).unwrap();

    let filter = Filter::new().eq("S_QUANTITY", 50i64);
    let err = stock.filter(&filter).await.unwrap_err();
    assert!(matches!(err, DriverError::InvalidParameters(_)));

    let allowed = filter.allow_full_scan();
    assert_eq!(stock.plan(&allowed).await.unwrap(), AccessPath::FullScan);
    assert_eq!(stock.filter(&allowed).await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_index_follows_updates_and_deletes() {
    let fx = Fixture::seeded(&[1]).await;
    let view = fx.registry.view(Table::Customer, 1).unwrap();
    let by_last = |last: &str| Filter::new().eq("C_W_ID", 1i64).eq("C_D_ID", 1i64).eq("C_LAST", last);

    view.update(&Table::Customer.key(&[1, 1, 2]).unwrap(), |c| {
        c.set("C_LAST", "JONES");
        Ok(())
    })
    .await
    .unwrap();

    let jones = view.filter(&by_last("JONES")).await.unwrap();
    assert_eq!(jones.len(), 1);
    assert_eq!(jones[0].record.str("C_FIRST").unwrap(), "Amy");
    assert_eq!(view.filter(&by_last("SMITH")).await.unwrap().len(), 2);

    view.delete(&Table::Customer.key(&[1, 1, 3]).unwrap())
        .await
        .unwrap();
    let smiths = view.filter(&by_last("SMITH")).await.unwrap();
    assert_eq!(smiths.len(), 1);
    assert_eq!(smiths[0].record.str("C_FIRST").unwrap(), "Cy");
}

#[tokio::test]
async fn test_update_of_missing_row_fails() {
    let fx = Fixture::seeded(&[1]).await;
    let view = fx.registry.view(Table::Orders, 1).unwrap();

    let err = view
        .update(&Table::Orders.key(&[1, 1, 99]).unwrap(), |_| Ok(()))
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::MissingRow { .. }));
}

#[tokio::test]
async fn test_unknown_index_column_is_rejected() {
    let fx = Fixture::empty(&[1]);
    let view = fx.registry.view(Table::Stock, 1).unwrap();

    assert!(view.build_index("C_LAST").await.is_err());
}
