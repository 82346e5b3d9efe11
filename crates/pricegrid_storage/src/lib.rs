#![forbid(unsafe_code)]

pub mod pricing_record;

pub use pricing_record::{PricingRecordStore, StorageError, DEFAULT_RECORD_PATH};
