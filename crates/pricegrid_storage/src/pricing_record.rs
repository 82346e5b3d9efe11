#![forbid(unsafe_code)]

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pricegrid_kernel_contracts::{ContractViolation, Matrix};
use tracing::{debug, info, warn};

pub const DEFAULT_RECORD_PATH: &str = "public/pricing.json";

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    Json(serde_json::Error),
    ContractViolation(ContractViolation),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::ContractViolation(v) => write!(f, "record violates contract: {v}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ContractViolation> for StorageError {
    fn from(value: ContractViolation) -> Self {
        Self::ContractViolation(value)
    }
}

/// The single durable pricing document. Every write replaces the whole file.
#[derive(Debug, Clone)]
pub struct PricingRecordStore {
    record_path: PathBuf,
}

impl PricingRecordStore {
    pub fn default_from_env() -> Self {
        let record_path = env::var("PRICEGRID_RECORD_PATH")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORD_PATH));
        Self::for_path(record_path)
    }

    pub fn for_path(record_path: PathBuf) -> Self {
        Self { record_path }
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    pub fn exists(&self) -> bool {
        self.record_path.is_file()
    }

    pub fn write_matrix(&self, matrix: &Matrix) -> Result<(), StorageError> {
        let serialized = serde_json::to_vec(matrix)?;
        if let Some(parent) = self.record_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        atomic_write(&self.record_path, &serialized)?;
        info!(
            path = %self.record_path.display(),
            bytes = serialized.len(),
            "pricing record written"
        );
        Ok(())
    }

    pub fn read_matrix(&self) -> Result<Option<Matrix>, StorageError> {
        let Some(raw) = self.read_raw()? else {
            return Ok(None);
        };
        let matrix = Matrix::from_json_str(&raw)?;
        Ok(Some(matrix))
    }

    /// Returns the stored document exactly as written.
    pub fn read_raw(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.record_path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.record_path.display(), "pricing record absent");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let mut tmp = path.to_path_buf();
    tmp.set_extension("json.tmp");
    fs::write(&tmp, data)?;
    if let Err(err) = fs::rename(&tmp, path) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %cleanup, "stale temp record left behind");
        }
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_record(name: &str) -> (PathBuf, PathBuf) {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(1);
        let base = env::temp_dir().join(format!("pricegrid-record-test-{name}-{suffix}"));
        let record = base.join("public").join("pricing.json");
        (base, record)
    }

    #[test]
    fn at_record_01_write_leaves_no_temp_file() {
        let (base, record) = temp_record("tmp");
        let store = PricingRecordStore::for_path(record.clone());
        store
            .write_matrix(&pricegrid_kernel_contracts::EMPTY_MATRIX)
            .unwrap();
        assert!(store.exists());
        let mut tmp = record.clone();
        tmp.set_extension("json.tmp");
        assert!(!tmp.exists());
        fs::remove_dir_all(base).unwrap();
    }

    #[test]
    fn at_record_02_unreadable_document_is_a_contract_violation() {
        let (base, record) = temp_record("corrupt");
        fs::create_dir_all(record.parent().unwrap()).unwrap();
        fs::write(&record, b"{\"mtm\": 1}").unwrap();
        let err = PricingRecordStore::for_path(record)
            .read_matrix()
            .unwrap_err();
        assert!(matches!(err, StorageError::ContractViolation(_)));
        fs::remove_dir_all(base).unwrap();
    }

    #[test]
    fn at_record_03_failed_rename_removes_temp_file() {
        let (base, record) = temp_record("rename");
        fs::create_dir_all(record.join("occupied")).unwrap();
        let store = PricingRecordStore::for_path(record.clone());
        let err = store
            .write_matrix(&pricegrid_kernel_contracts::EMPTY_MATRIX)
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        let mut tmp = record.clone();
        tmp.set_extension("json.tmp");
        assert!(!tmp.exists());
        assert!(record.is_dir());
        fs::remove_dir_all(base).unwrap();
    }
}
