use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rate used whenever no plausible USD/NPR rate can be sourced.
pub const DEFAULT_NPR_PER_USD: f64 = 133.65;

/// Plausible band for a sourced USD/NPR rate (exclusive on both ends).
pub const MIN_PLAUSIBLE_RATE: f64 = 100.0;
pub const MAX_PLAUSIBLE_RATE: f64 = 200.0;

pub fn is_plausible_rate(rate: f64) -> bool {
    rate.is_finite() && rate > MIN_PLAUSIBLE_RATE && rate < MAX_PLAUSIBLE_RATE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Gold,
    Silver,
}

impl AssetKind {
    /// Symbol used by the spot price provider
    pub fn symbol(&self) -> &'static str {
        match self {
            AssetKind::Gold => "XAU",
            AssetKind::Silver => "XAG",
        }
    }

    /// Decimal places kept on the USD spot price
    pub fn precision(&self) -> u32 {
        match self {
            AssetKind::Gold => 2,
            AssetKind::Silver => 3,
        }
    }

    /// USD per troy ounce served when the provider is unavailable
    pub fn fallback_usd(&self) -> f64 {
        match self {
            AssetKind::Gold => 2345.67,
            AssetKind::Silver => 27.89,
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Gold => write!(f, "gold"),
            AssetKind::Silver => write!(f, "silver"),
        }
    }
}

/// Spot price in USD per troy ounce, already rounded to the asset precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotPrice {
    pub asset: AssetKind,
    pub usd_per_ounce: f64,
    pub precision: u32,
}

impl SpotPrice {
    pub fn fallback(asset: AssetKind) -> Self {
        Self {
            asset,
            usd_per_ounce: asset.fallback_usd(),
            precision: asset.precision(),
        }
    }
}

/// Where an exchange rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    Official,
    FallbackApi,
    Default,
}

impl RateSource {
    pub fn label(&self) -> &'static str {
        match self {
            RateSource::Official => "NRB Official",
            RateSource::FallbackApi => "Fallback API",
            RateSource::Default => "Default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRate {
    pub npr_per_usd: f64,
    pub source: RateSource,
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn default_at(fetched_at: DateTime<Utc>) -> Self {
        Self {
            npr_per_usd: DEFAULT_NPR_PER_USD,
            source: RateSource::Default,
            fetched_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response body for GET /api/prices/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricesResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: PriceData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub gold_usd: f64,
    pub silver_usd: f64,
    pub exchange_rate: f64,
    pub exchange_source: String,
    pub gold_npr: f64,
    pub silver_npr: f64,
    pub gold_tola_npr: i64,
    pub silver_tola_npr: f64,
    pub gold_kg_npr: i64,
    pub silver_kg_npr: i64,
    pub timestamp: i64,           // Unix seconds
    pub timestamp_human: String,  // "%Y-%m-%d %H:%M:%S" UTC
    pub source: String,
    pub unit: String,
    pub conversion_note: String,
    pub premium_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold_premium_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silver_premium_pct: Option<f64>,
}
