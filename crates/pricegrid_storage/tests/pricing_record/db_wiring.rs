#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use pricegrid_kernel_contracts::{Matrix, PlanId, PlanRow, Price, TierId, EMPTY_MATRIX};
use pricegrid_storage::{PricingRecordStore, StorageError};
use rust_decimal::Decimal;

fn temp_base(name: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(1);
    std::env::temp_dir().join(format!("pricegrid-db-wiring-{name}-{suffix}"))
}

fn price(raw: &str) -> Price {
    Price::v1(Decimal::from_str(raw).unwrap()).unwrap()
}

fn seed_matrix() -> Matrix {
    Matrix::from_rows([
        (
            PlanId::Months36,
            PlanRow::v1(price("2592.8"), price("2981.72"), price("3889.2")).unwrap(),
        ),
        (
            PlanId::Months24,
            PlanRow::v1(price("3056.09"), price("3445.01"), price("4352.49")).unwrap(),
        ),
        (
            PlanId::Months12,
            PlanRow::v1(price("3528"), price("3916.92"), price("4824.4")).unwrap(),
        ),
        (
            PlanId::Mtm,
            PlanRow::v1(price("5880"), price("6268.92"), price("7176.4")).unwrap(),
        ),
    ])
    .unwrap()
}

#[test]
fn at_record_db_01_absent_record_reads_as_none() {
    let base = temp_base("absent");
    let store = PricingRecordStore::for_path(base.join("pricing.json"));
    assert!(!store.exists());
    assert!(store.read_matrix().unwrap().is_none());
    assert!(store.read_raw().unwrap().is_none());
}

#[test]
fn at_record_db_02_write_then_read_returns_same_matrix() {
    let base = temp_base("roundtrip");
    let store = PricingRecordStore::for_path(base.join("public").join("pricing.json"));
    store.write_matrix(&seed_matrix()).unwrap();

    assert_eq!(store.read_matrix().unwrap(), Some(seed_matrix()));
    let raw = store.read_raw().unwrap().unwrap();
    assert!(raw.starts_with(r#"{"36months":{"lite":2592.8,"standard":2981.72"#));
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_record_db_03_second_write_replaces_whole_document() {
    let base = temp_base("overwrite");
    let store = PricingRecordStore::for_path(base.join("pricing.json"));
    store.write_matrix(&seed_matrix()).unwrap();
    store.write_matrix(&EMPTY_MATRIX).unwrap();

    let stored = store.read_matrix().unwrap().unwrap();
    assert!(stored.is_empty_template());
    assert_eq!(stored.price(PlanId::Mtm, TierId::Unlimited), Price::ZERO);
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_record_db_04_write_into_unwritable_location_fails() {
    let base = temp_base("blocked");
    fs::create_dir_all(&base).unwrap();
    let blocker = base.join("not_a_dir");
    fs::write(&blocker, b"file").unwrap();
    let store = PricingRecordStore::for_path(blocker.join("pricing.json"));

    let err = store.write_matrix(&seed_matrix()).unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));
    fs::remove_dir_all(base).unwrap();
}
