#![forbid(unsafe_code)]

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pricegrid_kernel_contracts::{ContractViolation, Matrix};
use pricegrid_storage::{PricingRecordStore, StorageError, DEFAULT_RECORD_PATH};
use tracing::{error, info, warn};

pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:3000";
pub const SAVE_PRICING_ROUTE: &str = "/api/save-pricing";
pub const PRICING_RECORD_ROUTE: &str = "/pricing.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub bind: SocketAddr,
    pub record_path: PathBuf,
}

impl AdapterConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_env_var_map(|key| env::var(key).ok())
    }

    pub fn from_env_var_map<F>(mut env_getter: F) -> Result<Self, String>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let bind_raw = env_getter("PRICEGRID_HTTP_BIND")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|err| format!("PRICEGRID_HTTP_BIND '{bind_raw}' is not a socket address: {err}"))?;
        let record_path = env_getter("PRICEGRID_RECORD_PATH")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORD_PATH));
        Ok(Self { bind, record_path })
    }
}

#[derive(Debug)]
pub enum SavePricingOutcome {
    Saved(Matrix),
    Invalid(ContractViolation),
    Failed(StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub record_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EndpointErrorResponse {
    pub error: String,
}

/// Owns the durable pricing record behind the HTTP surface.
#[derive(Debug, Clone)]
pub struct PricingAdapterRuntime {
    store: PricingRecordStore,
}

impl PricingAdapterRuntime {
    pub fn new(store: PricingRecordStore) -> Self {
        Self { store }
    }

    pub fn default_from_env() -> Self {
        Self::new(PricingRecordStore::default_from_env())
    }

    pub fn for_record_path(record_path: PathBuf) -> Self {
        Self::new(PricingRecordStore::for_path(record_path))
    }

    pub fn store(&self) -> &PricingRecordStore {
        &self.store
    }

    /// Validates a raw request body and overwrites the record with it.
    pub fn save_pricing(&self, body: &str) -> SavePricingOutcome {
        let matrix = match Matrix::from_json_str(body) {
            Ok(matrix) => matrix,
            Err(violation) => {
                warn!(field = violation.field(), %violation, "pricing payload rejected");
                return SavePricingOutcome::Invalid(violation);
            }
        };
        match self.store.write_matrix(&matrix) {
            Ok(()) => {
                info!(path = %self.store.record_path().display(), "pricing saved");
                SavePricingOutcome::Saved(matrix)
            }
            Err(err) => {
                error!(path = %self.store.record_path().display(), error = %err, "pricing save failed");
                SavePricingOutcome::Failed(err)
            }
        }
    }

    pub fn read_record(&self) -> Result<Option<String>, StorageError> {
        self.store.read_raw()
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        match self.store.read_matrix() {
            Ok(record) => AdapterHealthResponse {
                status: "ok".to_string(),
                outcome: "HEALTHY".to_string(),
                reason: None,
                record_present: record.is_some(),
            },
            Err(err) => AdapterHealthResponse {
                status: "error".to_string(),
                outcome: "UNHEALTHY".to_string(),
                reason: Some(err.to_string()),
                record_present: self.store.exists(),
            },
        }
    }
}

pub type SharedRuntime = Arc<Mutex<PricingAdapterRuntime>>;

/// Routes for the pricing endpoint. Holding the runtime lock across a save
/// serializes writers.
pub fn pricing_router(runtime: PricingAdapterRuntime) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(SAVE_PRICING_ROUTE, post(save_pricing))
        .route(PRICING_RECORD_ROUTE, get(pricing_record))
        .with_state(Arc::new(Mutex::new(runtime)))
}

fn unknown_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(EndpointErrorResponse {
            error: "Unknown Error".to_string(),
        }),
    )
        .into_response()
}

async fn save_pricing(State(runtime): State<SharedRuntime>, body: Bytes) -> Response {
    let Ok(body) = String::from_utf8(body.to_vec()) else {
        warn!("pricing payload is not utf-8");
        return (StatusCode::UNPROCESSABLE_ENTITY, "Error").into_response();
    };
    // The record write blocks on file io.
    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = match runtime.lock() {
            Ok(runtime) => Ok(runtime.save_pricing(&body)),
            Err(_) => Err("adapter runtime lock poisoned".to_string()),
        };
        outcome
    })
    .await
    .unwrap_or_else(|err| Err(format!("pricing save task failed: {err}")));
    match outcome {
        Ok(SavePricingOutcome::Saved(matrix)) => (StatusCode::OK, Json(matrix)).into_response(),
        Ok(SavePricingOutcome::Invalid(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "Error").into_response()
        }
        Ok(SavePricingOutcome::Failed(_)) => unknown_error(),
        Err(reason) => {
            error!(%reason, "pricing save aborted");
            unknown_error()
        }
    }
}

async fn pricing_record(State(runtime): State<SharedRuntime>) -> Response {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => return unknown_error(),
    };
    match runtime.read_record() {
        Ok(Some(raw)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            raw,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Err(err) => {
            error!(error = %err, "pricing record unreadable");
            unknown_error()
        }
    }
}

async fn healthz(State(runtime): State<SharedRuntime>) -> (StatusCode, Json<AdapterHealthResponse>) {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdapterHealthResponse {
                    status: "error".to_string(),
                    outcome: "UNHEALTHY".to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    record_present: false,
                }),
            );
        }
    };
    let report = runtime.health_report();
    let status = if report.reason.is_none() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_record_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        env::temp_dir()
            .join(format!("pricegrid_adapter_{tag}_{nanos}"))
            .join("public")
            .join("pricing.json")
    }

    const FULL_PAYLOAD: &str = r#"{
        "36months": {"lite": 2592.8, "standard": 2981.72, "unlimited": 3889.2},
        "24months": {"lite": 3056.09, "standard": 3445.01, "unlimited": 4352.49},
        "12months": {"lite": 3528, "standard": 3916.92, "unlimited": 4824.4},
        "mtm": {"lite": 5880, "standard": 6268.92, "unlimited": 7176.4}
    }"#;

    #[test]
    fn at_adapter_01_missing_tier_is_invalid_and_not_written() {
        let runtime = PricingAdapterRuntime::for_record_path(temp_record_path("missing"));
        let body = FULL_PAYLOAD.replace(r#""standard": 6268.92, "#, "");
        match runtime.save_pricing(&body) {
            SavePricingOutcome::Invalid(v) => assert_eq!(v.field(), "matrix.mtm.standard"),
            other => panic!("expected invalid outcome, got {other:?}"),
        }
        assert_eq!(runtime.read_record().unwrap(), None);
    }

    #[test]
    fn at_adapter_02_full_payload_is_stored_verbatim() {
        let runtime = PricingAdapterRuntime::for_record_path(temp_record_path("full"));
        let SavePricingOutcome::Saved(matrix) = runtime.save_pricing(FULL_PAYLOAD) else {
            panic!("expected saved outcome");
        };
        let raw = runtime.read_record().unwrap().unwrap();
        assert_eq!(raw, serde_json::to_string(&matrix).unwrap());
        assert!(raw.starts_with(r#"{"36months":{"lite":2592.8,"standard":2981.72"#));
        assert!(runtime.health_report().record_present);
    }

    #[test]
    fn at_adapter_03_non_json_and_unknown_keys_are_invalid() {
        let runtime = PricingAdapterRuntime::for_record_path(temp_record_path("junk"));
        assert!(matches!(
            runtime.save_pricing("not json"),
            SavePricingOutcome::Invalid(_)
        ));
        let extra = FULL_PAYLOAD.replacen('{', r#"{"weekly": {"lite": 1, "standard": 2, "unlimited": 3}, "#, 1);
        assert!(matches!(
            runtime.save_pricing(&extra),
            SavePricingOutcome::Invalid(ContractViolation::UnknownField { .. })
        ));
    }

    #[test]
    fn at_adapter_04_unwritable_record_is_a_failure() {
        let blocker = temp_record_path("blocked");
        let parent = blocker.parent().unwrap().to_path_buf();
        fs::create_dir_all(parent.parent().unwrap()).unwrap();
        fs::write(&parent, b"file in the way").unwrap();
        let runtime = PricingAdapterRuntime::for_record_path(blocker);
        assert!(matches!(
            runtime.save_pricing(FULL_PAYLOAD),
            SavePricingOutcome::Failed(_)
        ));
    }

    #[test]
    fn at_adapter_05_config_defaults_and_overrides() {
        let cfg = AdapterConfig::from_env_var_map(|_| None).unwrap();
        assert_eq!(cfg.bind.to_string(), DEFAULT_HTTP_BIND);
        assert_eq!(cfg.record_path, PathBuf::from(DEFAULT_RECORD_PATH));

        let cfg = AdapterConfig::from_env_var_map(|key| match key {
            "PRICEGRID_HTTP_BIND" => Some("0.0.0.0:8088".to_string()),
            "PRICEGRID_RECORD_PATH" => Some("/srv/pricing.json".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.bind.port(), 8088);
        assert_eq!(cfg.record_path, PathBuf::from("/srv/pricing.json"));

        assert!(AdapterConfig::from_env_var_map(|key| {
            (key == "PRICEGRID_HTTP_BIND").then(|| "nowhere".to_string())
        })
        .is_err());
    }
}
