// src/lib.rs

use axum::{routing::get, Router};
use std::sync::Arc;

use config::AppConfig;
use services::{
    aggregator::PriceAggregator, clock::Clock, exchange_rate::ExchangeRateService,
    gold_api::GoldApiService, health::HealthService, price_service::PriceService,
    response_cache::ResponseCache,
};

#[derive(Clone)]
pub struct AppState {
    pub prices: PriceService,
    pub health: HealthService,
}

impl AppState {
    /// Wire up the upstream clients, caches and aggregator from config
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let gold_api = GoldApiService::new(
            config.gold_api_key.clone(),
            config.gold_api_base_url.clone(),
            config.price_timeout,
        );
        let exchange_rates = ExchangeRateService::new(config.exchange_rate.clone(), clock.clone());

        let aggregator = PriceAggregator::new(
            Arc::new(gold_api.clone()),
            Arc::new(exchange_rates.clone()),
            config.premiums,
            config.fetch_deadline,
            clock.clone(),
        );
        let cache = ResponseCache::new(config.response_cache_ttl, clock.clone());

        Self {
            prices: PriceService::new(aggregator, cache),
            health: HealthService::new(
                gold_api,
                exchange_rates,
                config.health_probe_exchange,
                config.premiums.is_some(),
                clock,
            ),
        }
    }
}

/// API routes, with and without the trailing slash
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/prices", get(handlers::prices::get_prices))
        .route("/api/prices/", get(handlers::prices::get_prices))
        .route("/api/health", get(handlers::health::health_check))
        .route("/api/health/", get(handlers::health::health_check))
        .with_state(state)
}

pub mod services {
    pub mod aggregator;
    pub mod clock;
    pub mod conversion;
    pub mod exchange_rate;
    pub mod gold_api;
    pub mod health;
    pub mod price_service;
    pub mod response_cache;
}

pub mod scrapers {
    pub mod forex_page;
}

pub mod config;
pub mod error;
pub mod models;
pub mod handlers;
