#![forbid(unsafe_code)]

use std::env;
use std::fmt;
use std::time::Duration;

use pricegrid_kernel_contracts::Matrix;
use tracing::{debug, warn};

pub const SAVE_PRICING_PATH: &str = "/api/save-pricing";
pub const SAVE_CONNECT_TIMEOUT_MS_DEFAULT: u64 = 3_000;
pub const SAVE_REQUEST_TIMEOUT_MS_DEFAULT: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The endpoint refused the payload shape (422).
    Rejected { status: u16 },
    Server { status: u16, message: Option<String> },
    Transport(String),
    Decode(String),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status } => write!(f, "pricing rejected by endpoint (http {status})"),
            Self::Server { status, message } => match message {
                Some(m) => write!(f, "pricing save failed (http {status}): {m}"),
                None => write!(f, "pricing save failed (http {status})"),
            },
            Self::Transport(err) => write!(f, "pricing save transport error: {err}"),
            Self::Decode(err) => write!(f, "pricing save response unreadable: {err}"),
        }
    }
}

impl std::error::Error for SaveError {}

pub trait PricingSaveEngine {
    /// Submits the whole matrix and returns the stored value echoed back.
    fn save(&self, matrix: &Matrix) -> Result<Matrix, SaveError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingSaveHttpConfig {
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl PricingSaveHttpConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout_ms: SAVE_CONNECT_TIMEOUT_MS_DEFAULT,
            request_timeout_ms: SAVE_REQUEST_TIMEOUT_MS_DEFAULT,
        }
    }

    /// `base` is a server origin such as `http://127.0.0.1:3000`.
    pub fn for_base_url(base: &str) -> Self {
        Self::new(format!("{}{}", base.trim_end_matches('/'), SAVE_PRICING_PATH))
    }

    pub fn from_env() -> Option<Self> {
        Self::from_env_var_map(|key| env::var(key).ok())
    }

    pub fn from_env_var_map<F>(mut env_getter: F) -> Option<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let endpoint = env_getter("PRICEGRID_SAVE_ENDPOINT")?.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }
        let connect_timeout_ms = env_getter("PRICEGRID_SAVE_CONNECT_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| (100..=60_000).contains(v))
            .unwrap_or(SAVE_CONNECT_TIMEOUT_MS_DEFAULT);
        let request_timeout_ms = env_getter("PRICEGRID_SAVE_REQUEST_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| (100..=120_000).contains(v))
            .unwrap_or(SAVE_REQUEST_TIMEOUT_MS_DEFAULT);
        Some(Self {
            endpoint,
            connect_timeout_ms,
            request_timeout_ms,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingSaveRuntime {
    /// Accepts every save without leaving the process.
    Loopback,
    Http(PricingSaveHttpConfig),
    AlwaysFail { message: String },
}

impl Default for PricingSaveRuntime {
    fn default() -> Self {
        Self::from_env_or_loopback()
    }
}

impl PricingSaveRuntime {
    pub fn from_env_or_loopback() -> Self {
        match PricingSaveHttpConfig::from_env() {
            Some(config) => Self::Http(config),
            None => Self::Loopback,
        }
    }

    pub fn always_fail(message: &str) -> Self {
        Self::AlwaysFail {
            message: message.to_string(),
        }
    }
}

impl PricingSaveEngine for PricingSaveRuntime {
    fn save(&self, matrix: &Matrix) -> Result<Matrix, SaveError> {
        match self {
            Self::Loopback => Ok(*matrix),
            Self::AlwaysFail { message } => Err(SaveError::Transport(message.clone())),
            Self::Http(config) => send_http_save(config, matrix),
        }
    }
}

#[derive(serde::Deserialize)]
struct EndpointErrorBody {
    error: String,
}

fn send_http_save(config: &PricingSaveHttpConfig, matrix: &Matrix) -> Result<Matrix, SaveError> {
    let payload = serde_json::to_string(matrix)
        .map_err(|err| SaveError::Decode(format!("payload encode failed: {err}")))?;
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_millis(config.connect_timeout_ms))
        .timeout_read(Duration::from_millis(config.request_timeout_ms))
        .timeout_write(Duration::from_millis(config.request_timeout_ms))
        .build();
    debug!(endpoint = %config.endpoint, bytes = payload.len(), "submitting pricing matrix");
    match agent
        .post(&config.endpoint)
        .set("content-type", "application/json")
        .send_string(&payload)
    {
        Ok(resp) => {
            let status = resp.status();
            let body = resp
                .into_string()
                .map_err(|err| SaveError::Decode(err.to_string()))?;
            if !(200..=299).contains(&status) {
                return Err(SaveError::Server {
                    status,
                    message: None,
                });
            }
            Matrix::from_json_str(&body).map_err(|v| SaveError::Decode(v.to_string()))
        }
        Err(ureq::Error::Status(422, _)) => {
            warn!(endpoint = %config.endpoint, "pricing payload rejected");
            Err(SaveError::Rejected { status: 422 })
        }
        Err(ureq::Error::Status(status, resp)) => {
            let message = resp
                .into_string()
                .ok()
                .and_then(|body| serde_json::from_str::<EndpointErrorBody>(&body).ok())
                .map(|b| b.error);
            warn!(endpoint = %config.endpoint, status, "pricing save failed");
            Err(SaveError::Server { status, message })
        }
        Err(ureq::Error::Transport(err)) => Err(SaveError::Transport(err.to_string())),
    }
}
