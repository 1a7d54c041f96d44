//! Price Aggregator
//!
//! Fetches gold, silver and the USD/NPR rate concurrently, then converts the
//! spot prices into NPR per ounce, tola and kilogram. Any source that fails
//! or misses the fetch deadline is replaced by its fallback value; if the
//! payload itself cannot be built, the full fallback payload is served with
//! `status: "error"`.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;

use crate::error::{AggregationError, FetchError};
use crate::models::prices::{
    AssetKind, ExchangeRate, PriceData, PricesResponse, RateSource, ResponseStatus, SpotPrice,
};
use crate::services::clock::Clock;
use crate::services::conversion::{quote, round_dp, round_whole, Premiums};
use crate::services::exchange_rate::RateProvider;
use crate::services::gold_api::SpotPriceSource;

const UNIT: &str = "USD per troy ounce";
const CONVERSION_NOTE: &str = "1 tola = 11.6638g, 1 troy ounce = 31.1035g";
const FALLBACK_EXCHANGE_SOURCE: &str = "Fallback";
const FALLBACK_SOURCE: &str = "Fallback due to error";

#[derive(Clone)]
pub struct PriceAggregator {
    spot: Arc<dyn SpotPriceSource>,
    rates: Arc<dyn RateProvider>,
    premiums: Option<Premiums>,
    fetch_deadline: Duration,
    clock: Arc<dyn Clock>,
}

impl PriceAggregator {
    pub fn new(
        spot: Arc<dyn SpotPriceSource>,
        rates: Arc<dyn RateProvider>,
        premiums: Option<Premiums>,
        fetch_deadline: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            spot,
            rates,
            premiums,
            fetch_deadline,
            clock,
        }
    }

    /// Build the prices payload. Never fails: errors become a fallback payload.
    pub async fn build_quote(&self) -> PricesResponse {
        let now = self.clock.now();

        match self.fetch_and_compose(now).await {
            Ok(data) => {
                tracing::info!(
                    "Prices: Gold ${}, Silver ${}, Rate NPR {} ({})",
                    data.gold_usd,
                    data.silver_usd,
                    data.exchange_rate,
                    data.exchange_source
                );
                PricesResponse {
                    status: ResponseStatus::Success,
                    message: None,
                    data,
                }
            }
            Err(e) => {
                tracing::error!("Price aggregation failed, serving fallback prices: {}", e);
                PricesResponse {
                    status: ResponseStatus::Error,
                    message: Some(e.to_string()),
                    data: self.fallback_data(now),
                }
            }
        }
    }

    async fn fetch_and_compose(&self, now: DateTime<Utc>) -> Result<PriceData, AggregationError> {
        let gold_task = tokio::spawn(with_deadline(
            self.fetch_deadline,
            fetch_spot(self.spot.clone(), AssetKind::Gold),
        ));
        let silver_task = tokio::spawn(with_deadline(
            self.fetch_deadline,
            fetch_spot(self.spot.clone(), AssetKind::Silver),
        ));
        let rate_task = tokio::spawn(with_deadline(
            self.fetch_deadline,
            fetch_rate(self.rates.clone()),
        ));

        let (gold, silver, rate) = tokio::join!(gold_task, silver_task, rate_task);

        let gold = gold.map_err(task_failed)?;
        let silver = silver.map_err(task_failed)?;
        let rate = rate.map_err(task_failed)?;

        let all_failed = gold.is_err()
            && silver.is_err()
            && rate.as_ref().map_or(true, |r| r.source == RateSource::Default);

        let gold = gold.unwrap_or_else(|e| spot_fallback(AssetKind::Gold, e));
        let silver = silver.unwrap_or_else(|e| spot_fallback(AssetKind::Silver, e));
        let rate = rate.unwrap_or_else(|e| {
            tracing::warn!("Exchange rate unavailable, using default: {}", e);
            ExchangeRate::default_at(now)
        });

        if all_failed {
            return Err(AggregationError::AllSourcesUnavailable);
        }

        compose(
            &gold,
            &silver,
            &rate,
            self.premiums.as_ref(),
            now,
            rate.source.label(),
            &format!("Gold API + {}", self.rates.label()),
        )
    }

    fn fallback_data(&self, now: DateTime<Utc>) -> PriceData {
        let compose_fallback = |premiums: Option<&Premiums>| {
            compose(
                &SpotPrice::fallback(AssetKind::Gold),
                &SpotPrice::fallback(AssetKind::Silver),
                &ExchangeRate::default_at(now),
                premiums,
                now,
                FALLBACK_EXCHANGE_SOURCE,
                FALLBACK_SOURCE,
            )
        };

        match compose_fallback(self.premiums.as_ref()) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Premiums cannot be applied to fallback prices, dropping them: {}", e);
                compose_fallback(None).expect("fallback constants are finite and positive")
            }
        }
    }
}

async fn fetch_spot(source: Arc<dyn SpotPriceSource>, asset: AssetKind) -> Result<SpotPrice, FetchError> {
    source.fetch_spot(asset).await
}

async fn fetch_rate(rates: Arc<dyn RateProvider>) -> Result<ExchangeRate, FetchError> {
    Ok(rates.get_rate().await)
}

async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(format!(
            "no answer within {}s",
            deadline.as_secs_f64()
        ))),
    }
}

fn task_failed(e: JoinError) -> AggregationError {
    AggregationError::TaskFailed(e.to_string())
}

fn spot_fallback(asset: AssetKind, e: FetchError) -> SpotPrice {
    let fallback = SpotPrice::fallback(asset);
    tracing::warn!(
        "{} price unavailable, using fallback ${}: {}",
        asset,
        fallback.usd_per_ounce,
        e
    );
    fallback
}

fn ensure_positive(field: &'static str, value: f64) -> Result<f64, AggregationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AggregationError::InvalidValue { field, value })
    }
}

/// Combine spot prices and a rate into the rounded payload body
pub fn compose(
    gold: &SpotPrice,
    silver: &SpotPrice,
    rate: &ExchangeRate,
    premiums: Option<&Premiums>,
    now: DateTime<Utc>,
    exchange_source: &str,
    source: &str,
) -> Result<PriceData, AggregationError> {
    let gold_usd = ensure_positive("gold_usd", gold.usd_per_ounce)?;
    let silver_usd = ensure_positive("silver_usd", silver.usd_per_ounce)?;
    let npr_per_usd = ensure_positive("exchange_rate", rate.npr_per_usd)?;

    let gold_quote = quote(AssetKind::Gold, gold_usd, npr_per_usd, premiums);
    let silver_quote = quote(AssetKind::Silver, silver_usd, npr_per_usd, premiums);

    Ok(PriceData {
        gold_usd: round_dp("gold_usd", gold_quote.usd, AssetKind::Gold.precision())?,
        silver_usd: round_dp("silver_usd", silver_quote.usd, AssetKind::Silver.precision())?,
        exchange_rate: round_dp("exchange_rate", npr_per_usd, 2)?,
        exchange_source: exchange_source.to_string(),
        gold_npr: round_dp("gold_npr", gold_quote.npr_per_ounce, 2)?,
        silver_npr: round_dp("silver_npr", silver_quote.npr_per_ounce, 2)?,
        gold_tola_npr: round_whole("gold_tola_npr", gold_quote.npr_per_tola)?,
        silver_tola_npr: round_dp("silver_tola_npr", silver_quote.npr_per_tola, 2)?,
        gold_kg_npr: round_whole("gold_kg_npr", gold_quote.npr_per_kg)?,
        silver_kg_npr: round_whole("silver_kg_npr", silver_quote.npr_per_kg)?,
        timestamp: now.timestamp(),
        timestamp_human: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        source: source.to_string(),
        unit: UNIT.to_string(),
        conversion_note: CONVERSION_NOTE.to_string(),
        premium_applied: premiums.is_some(),
        gold_premium_pct: premiums.and_then(|p| p.percent(AssetKind::Gold)),
        silver_premium_pct: premiums.and_then(|p| p.percent(AssetKind::Silver)),
    })
}
