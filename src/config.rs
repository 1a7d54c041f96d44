//! Service configuration, read from environment variables (and `.env`).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::services::conversion::Premiums;
use crate::services::exchange_rate::{ExchangeRateConfig, RateProviderMode};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub gold_api_key: String,
    pub gold_api_base_url: String,
    pub price_timeout: Duration,
    pub exchange_rate: ExchangeRateConfig,
    pub premiums: Option<Premiums>,
    pub response_cache_ttl: Duration,
    pub fetch_deadline: Duration,
    pub health_probe_exchange: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let gold_api_key = string("GOLD_API_KEY", "");
        if gold_api_key.is_empty() {
            tracing::warn!("GOLD_API_KEY is not set, gold-api.com requests may be rejected");
        }

        let apply_premiums: bool = parse(&lookup, "APPLY_NEPAL_PREMIUMS", false)?;
        let premiums = if apply_premiums {
            Some(Premiums {
                gold: parse_premium(&lookup, "GOLD_PREMIUM", Premiums::NEPAL.gold)?,
                silver: parse_premium(&lookup, "SILVER_PREMIUM", Premiums::NEPAL.silver)?,
            })
        } else {
            None
        };

        Ok(Self {
            bind_addr: string("BIND_ADDR", "0.0.0.0:3000"),
            gold_api_key,
            gold_api_base_url: string("GOLD_API_BASE_URL", "https://api.gold-api.com"),
            price_timeout: secs(&lookup, "PRICE_TIMEOUT_SECS", 5)?,
            exchange_rate: ExchangeRateConfig {
                mode: parse(&lookup, "EXCHANGE_RATE_PROVIDER", RateProviderMode::Nrb)?,
                forex_page_url: string("FOREX_PAGE_URL", "https://www.nrb.org.np/forex/"),
                forex_page_timeout: secs(&lookup, "FOREX_PAGE_TIMEOUT_SECS", 5)?,
                api_url: string(
                    "EXCHANGE_RATE_API_URL",
                    "https://api.exchangerate-api.com/v4/latest/USD",
                ),
                api_timeout: secs(&lookup, "EXCHANGE_API_TIMEOUT_SECS", 3)?,
                cache_ttl: secs(&lookup, "RATE_CACHE_SECS", 300)?,
            },
            premiums,
            response_cache_ttl: secs(&lookup, "RESPONSE_CACHE_SECS", 30)?,
            fetch_deadline: secs(&lookup, "FETCH_DEADLINE_SECS", 10)?,
            health_probe_exchange: parse(&lookup, "HEALTH_PROBE_EXCHANGE", false)?,
            cors_allowed_origins: string(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000,http://127.0.0.1:3000",
            )
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        })
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn secs<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse(lookup, key, default).map(Duration::from_secs)
}

const MAX_PREMIUM: f64 = 10.0;

// A premium below 1.0 would be a discount; reject it along with garbage
fn parse_premium<F>(lookup: &F, key: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: f64 = parse(lookup, key, default)?;
    if value.is_finite() && (1.0..MAX_PREMIUM).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    }
}
