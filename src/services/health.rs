use std::sync::Arc;

use crate::models::health::{ApiStatuses, ExchangeRateStatus, HealthResponse};
use crate::models::prices::{AssetKind, DEFAULT_NPR_PER_USD, RateSource};
use crate::services::clock::Clock;
use crate::services::exchange_rate::ExchangeRateService;
use crate::services::gold_api::GoldApiService;

pub const SERVICE_NAME: &str = "Gold & Silver Price Tracker";

/// Live probes of the upstream APIs plus the state of the rate cache.
/// Bypasses the response cache entirely.
#[derive(Clone)]
pub struct HealthService {
    gold_api: GoldApiService,
    exchange_rates: ExchangeRateService,
    probe_exchange: bool,
    premiums_applied: bool,
    clock: Arc<dyn Clock>,
}

impl HealthService {
    pub fn new(
        gold_api: GoldApiService,
        exchange_rates: ExchangeRateService,
        probe_exchange: bool,
        premiums_applied: bool,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gold_api,
            exchange_rates,
            probe_exchange,
            premiums_applied,
            clock,
        }
    }

    pub async fn check_health(&self) -> HealthResponse {
        let (gold_api, exchange_api) = tokio::join!(
            self.gold_api.probe(AssetKind::Gold),
            async {
                if self.probe_exchange {
                    Some(self.exchange_rates.probe_api().await)
                } else {
                    None
                }
            }
        );

        if gold_api != "working" {
            tracing::warn!("Gold API health probe: {}", gold_api);
        }

        let (current_rate, source) = match self.exchange_rates.snapshot() {
            Some(rate) => (rate.npr_per_usd, rate.source),
            None => (DEFAULT_NPR_PER_USD, RateSource::Default),
        };

        HealthResponse {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            timestamp: self.clock.now().timestamp(),
            apis: ApiStatuses {
                gold_api,
                exchange_api,
            },
            exchange_rate: ExchangeRateStatus {
                current_rate,
                source: source.label().to_string(),
                cache_age_seconds: self.exchange_rates.cache_age_secs(),
            },
            premiums_applied: self.premiums_applied,
        }
    }
}
