use thiserror::Error;

/// Failure of a single upstream fetch. Always recovered with a fallback value.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Upstream returned status {0}")]
    Status(u16),
    #[error("Invalid upstream data: {0}")]
    InvalidData(String),
    #[error("Upstream timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_decode() {
            FetchError::InvalidData(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Failure while composing the price payload.
///
/// Only ever visible to clients as `status: "error"` plus a message; the
/// HTTP response itself stays 200.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
    #[error("All upstream price sources are unavailable")]
    AllSourcesUnavailable,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
