//! Table key layouts on top of the key codec.

use tpcc_kv::codec::{KeyCodec, KeyField};
use tpcc_kv::{DriverError, Record, Table};

#[test]
fn test_key_order_matches_order_id_order() {
    let mut keys: Vec<String> = [3, 120, 45, 1000, 7]
        .iter()
        .map(|o_id| Table::Orders.key(&[1, 4, *o_id]).unwrap())
        .collect();
    keys.sort();

    let decoded: Vec<i64> = keys
        .iter()
        .map(|k| Table::Orders.decode_key(k).unwrap()[2])
        .collect();
    assert_eq!(decoded, vec![3, 7, 45, 120, 1000]);
}

#[test]
fn test_partition_field_leads_the_key() {
    let key = Table::OrderLine.key(&[2, 3, 10, 1]).unwrap();
    let prefix = Table::OrderLine.prefix(&[2]).unwrap();
    assert!(key.starts_with(&prefix));
    assert!(!Table::OrderLine.key(&[20, 3, 10, 1]).unwrap().starts_with(&prefix));
}

#[test]
fn test_key_from_record_round_trips() {
    let record = Record::new()
        .with("C_ID", 2100i64)
        .with("C_D_ID", 10i64)
        .with("C_W_ID", 3i64)
        .with("C_LAST", "ABLEPRI");

    let key = Table::Customer.key_for(&record).unwrap();
    assert_eq!(Table::Customer.decode_key(&key).unwrap(), vec![3, 10, 2100]);
}

#[test]
fn test_wrong_arity_and_generated_keys_are_rejected() {
    assert!(matches!(
        Table::District.key(&[1]),
        Err(DriverError::Encoding(_))
    ));
    assert!(Table::History.key(&[1]).is_err());
    assert!(Table::Stock.prefix(&[1, 2, 3]).is_err());
}

#[test]
fn test_mixed_fields_decode_by_kind() {
    use tpcc_kv::codec::FieldKind;

    let key = KeyCodec::encode(&[KeyField::text("hist"), KeyField::padded(42, 6)]).unwrap();
    let fields = KeyCodec::decode_fields(&key, &[FieldKind::Text, FieldKind::Padded(6)]).unwrap();
    assert_eq!(fields, vec![KeyField::text("hist"), KeyField::padded(42, 6)]);

    assert!(KeyCodec::decode_fields(&key, &[FieldKind::Text, FieldKind::Padded(4)]).is_err());
    assert!(KeyCodec::decode_fields("x:y", &[FieldKind::Text, FieldKind::Int]).is_err());
}
