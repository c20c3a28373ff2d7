use crate::config::ValidationError;
use hyper::StatusCode;
use thiserror::Error;

/// Result type alias for numbers-router operations
pub type Result<T, E = NumbersRouterError> = std::result::Result<T, E>;

/// Errors that can occur while serving requests
#[derive(Error, Debug)]
pub enum NumbersRouterError {
    #[error("Response serialization error: {0}")]
    ResponseSerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single upstream did not contribute any numbers.
#[derive(Error, Debug)]
pub enum FetchError {
    /// DNS, connect, timeout or body read failure
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// Any status other than 200
    #[error("status code not ok: {0}")]
    BadStatus(StatusCode),

    #[error("invalid JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid response: expected non-empty numbers and no strings")]
    InvalidShape,

    /// The fetch task panicked or was cancelled
    #[error("fetch task failed: {0}")]
    TaskFailed(String),
}

impl FetchError {
    /// Short tag used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network_error",
            FetchError::BadStatus(_) => "bad_status",
            FetchError::Decode(_) => "decode_error",
            FetchError::InvalidShape => "invalid_shape",
            FetchError::TaskFailed(_) => "task_failed",
        }
    }
}
