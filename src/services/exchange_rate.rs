//! Exchange Rate Resolver
//!
//! Keeps one USD/NPR rate in memory and refreshes it once the cache window
//! has passed. Refresh tries the NRB forex page, then a JSON rate API, then
//! the hardcoded default. It never fails.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::models::prices::{is_plausible_rate, ExchangeRate, RateSource};
use crate::scrapers::forex_page::extract_usd_rate_from_html;
use crate::services::clock::{is_fresh, Clock};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Anything that can hand out a usable USD/NPR rate.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn get_rate(&self) -> ExchangeRate;

    /// Human-readable name of the rate source, used in the payload `source`
    fn label(&self) -> &str;
}

/// Which tiers the resolver walks through on a cache miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateProviderMode {
    /// NRB forex page, then the JSON API
    Nrb,
    /// JSON API only
    Api,
}

impl std::str::FromStr for RateProviderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nrb" => Ok(RateProviderMode::Nrb),
            "api" => Ok(RateProviderMode::Api),
            other => Err(format!("unknown exchange rate provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeRateConfig {
    pub mode: RateProviderMode,
    pub forex_page_url: String,
    pub forex_page_timeout: Duration,
    pub api_url: String,
    pub api_timeout: Duration,
    pub cache_ttl: Duration,
}

// exchangerate-api.com: {"rates": {"NPR": 133.5}}
// open.er-api.com adds {"result": "success" | "error", "error-type": ...}
#[derive(Debug, Deserialize)]
struct RateApiResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

#[derive(Clone)]
pub struct ExchangeRateService {
    client: Client,
    config: ExchangeRateConfig,
    cache: Arc<RwLock<Option<ExchangeRate>>>,
    clock: Arc<dyn Clock>,
}

impl ExchangeRateService {
    pub fn new(config: ExchangeRateConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client: Client::new(),
            config,
            cache: Arc::new(RwLock::new(None)),
            clock,
        }
    }

    /// Last resolved rate, without triggering a refresh
    pub fn snapshot(&self) -> Option<ExchangeRate> {
        *self.cache.read()
    }

    /// Seconds since the cached rate was resolved
    pub fn cache_age_secs(&self) -> Option<i64> {
        self.snapshot()
            .map(|rate| (self.clock.now() - rate.fetched_at).num_seconds())
    }

    /// Live reachability check of the JSON rate API. Never fails.
    pub async fn probe_api(&self) -> String {
        let result = self
            .client
            .get(&self.config.api_url)
            .timeout(self.config.api_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => "working".to_string(),
            Ok(response) => format!("failed: {}", response.status().as_u16()),
            Err(e) => format!("connection failed: {}", e),
        }
    }

    fn cached(&self) -> Option<ExchangeRate> {
        let cached = *self.cache.read();
        cached
            .filter(|rate| is_fresh(self.clock.now(), rate.fetched_at, self.config.cache_ttl))
    }

    async fn refresh(&self) -> ExchangeRate {
        if self.config.mode == RateProviderMode::Nrb {
            match self.fetch_official_rate().await {
                Ok(rate) => return self.resolved(rate, RateSource::Official),
                Err(e) => tracing::warn!("NRB forex page unavailable: {}", e),
            }
        }

        match self.fetch_api_rate().await {
            Ok(rate) => self.resolved(rate, RateSource::FallbackApi),
            Err(e) => {
                tracing::warn!("Exchange rate API unavailable, using default rate: {}", e);
                ExchangeRate::default_at(self.clock.now())
            }
        }
    }

    fn resolved(&self, npr_per_usd: f64, source: RateSource) -> ExchangeRate {
        ExchangeRate {
            npr_per_usd,
            source,
            fetched_at: self.clock.now(),
        }
    }

    /// Scrape the USD rate from the NRB forex page
    async fn fetch_official_rate(&self) -> Result<f64, FetchError> {
        let response = self
            .client
            .get(&self.config.forex_page_url)
            .header("user-agent", BROWSER_USER_AGENT)
            .timeout(self.config.forex_page_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;

        extract_usd_rate_from_html(&html)
            .ok_or_else(|| FetchError::InvalidData("no plausible USD rate on forex page".to_string()))
    }

    async fn fetch_api_rate(&self) -> Result<f64, FetchError> {
        let response = self
            .client
            .get(&self.config.api_url)
            .header("accept", "application/json")
            .timeout(self.config.api_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: RateApiResponse = response.json().await?;

        if let Some(result) = body.result.as_deref() {
            if result != "success" {
                return Err(FetchError::InvalidData(format!(
                    "rate API returned {}: {}",
                    result,
                    body.error_type.as_deref().unwrap_or("unknown error")
                )));
            }
        }

        let rate = body
            .rates
            .get("NPR")
            .copied()
            .ok_or_else(|| FetchError::InvalidData("no NPR rate in response".to_string()))?;

        if !is_plausible_rate(rate) {
            return Err(FetchError::InvalidData(format!("implausible NPR rate {}", rate)));
        }

        Ok(rate)
    }
}

#[async_trait]
impl RateProvider for ExchangeRateService {
    async fn get_rate(&self) -> ExchangeRate {
        if let Some(rate) = self.cached() {
            tracing::debug!("Exchange rate cache hit: NPR {} ({})", rate.npr_per_usd, rate.source.label());
            return rate;
        }

        // No single-flight: concurrent misses may each refresh
        let rate = self.refresh().await;
        *self.cache.write() = Some(rate);

        tracing::info!("Exchange rate: NPR {} ({})", rate.npr_per_usd, rate.source.label());
        rate
    }

    fn label(&self) -> &str {
        match self.config.mode {
            RateProviderMode::Nrb => "NRB Exchange Rate",
            RateProviderMode::Api => "Exchange Rate API",
        }
    }
}
