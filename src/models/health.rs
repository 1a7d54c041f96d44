use serde::{Deserialize, Serialize};

/// Response body for GET /api/health/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,   // Always "healthy"
    pub service: String,
    pub timestamp: i64,
    pub apis: ApiStatuses,
    pub exchange_rate: ExchangeRateStatus,
    pub premiums_applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStatuses {
    pub gold_api: String, // "working", "failed: 503", "connection failed: ..."
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_api: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateStatus {
    pub current_rate: f64,
    pub source: String,
    pub cache_age_seconds: Option<i64>, // None until the first rate refresh
}
