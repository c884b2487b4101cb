use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Quote fetch error: {0}")]
    QuoteFetch(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),
    #[error("Tap reader unavailable: {0}")]
    TapUnavailable(String),
    #[error("Session task failed: {0}")]
    SessionTask(#[from] tokio::task::JoinError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
