#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::DateTime;
use http_body_util::BodyExt;
use nepal_metals_backend::{
    build_router, config::AppConfig, services::clock::ManualClock, AppState,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_API_KEY: &str = "test-gold-key";
pub const START_TS: i64 = 1_700_000_000;

/// What the fake upstream server answers
#[derive(Clone)]
pub struct UpstreamSpec {
    pub gold_status: StatusCode,
    pub gold_usd: f64,
    pub silver_usd: f64,
    pub forex_status: StatusCode,
    pub forex_html: String,
    pub rate_api_status: StatusCode,
    pub rate_api_body: Value,
}

impl Default for UpstreamSpec {
    fn default() -> Self {
        Self {
            gold_status: StatusCode::OK,
            gold_usd: 2000.0,
            silver_usd: 25.0,
            forex_status: StatusCode::OK,
            forex_html: forex_page("130.00"),
            rate_api_status: StatusCode::OK,
            rate_api_body: json!({"base": "USD", "rates": {"NPR": 131.5}}),
        }
    }
}

impl UpstreamSpec {
    /// Every upstream answers 503
    pub fn all_down() -> Self {
        Self {
            gold_status: StatusCode::SERVICE_UNAVAILABLE,
            forex_status: StatusCode::SERVICE_UNAVAILABLE,
            rate_api_status: StatusCode::SERVICE_UNAVAILABLE,
            ..Self::default()
        }
    }
}

/// Request counters per upstream path
#[derive(Clone, Default)]
pub struct Hits {
    pub gold: Arc<AtomicUsize>,
    pub silver: Arc<AtomicUsize>,
    pub forex: Arc<AtomicUsize>,
    pub rate_api: Arc<AtomicUsize>,
    pub missing_api_key: Arc<AtomicUsize>,
}

impl Hits {
    pub fn gold(&self) -> usize {
        self.gold.load(Ordering::SeqCst)
    }

    pub fn silver(&self) -> usize {
        self.silver.load(Ordering::SeqCst)
    }

    pub fn forex(&self) -> usize {
        self.forex.load(Ordering::SeqCst)
    }

    pub fn rate_api(&self) -> usize {
        self.rate_api.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct Upstream {
    spec: UpstreamSpec,
    hits: Hits,
}

pub fn forex_page(usd_rate: &str) -> String {
    format!(
        "<html><body><h1>Foreign Exchange Rates</h1><table>\
         <tr><th>Currency</th><th>Unit</th><th>Buy</th><th>Sell</th></tr>\
         <tr><td>Indian Rupee (INR)</td><td>100</td><td>160.00</td><td>160.15</td></tr>\
         <tr><td>U.S. Dollar (USD)</td><td>1</td><td>{}</td><td>999.99</td></tr>\
         </table></body></html>",
        usd_rate
    )
}

fn check_api_key(up: &Upstream, headers: &HeaderMap) {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(TEST_API_KEY) {
        up.hits.missing_api_key.fetch_add(1, Ordering::SeqCst);
    }
}

async fn gold_price(State(up): State<Upstream>, headers: HeaderMap) -> Response {
    up.hits.gold.fetch_add(1, Ordering::SeqCst);
    check_api_key(&up, &headers);
    if up.spec.gold_status != StatusCode::OK {
        return up.spec.gold_status.into_response();
    }
    Json(json!({"name": "Gold", "price": up.spec.gold_usd, "symbol": "XAU"})).into_response()
}

async fn silver_price(State(up): State<Upstream>, headers: HeaderMap) -> Response {
    up.hits.silver.fetch_add(1, Ordering::SeqCst);
    check_api_key(&up, &headers);
    if up.spec.gold_status != StatusCode::OK {
        return up.spec.gold_status.into_response();
    }
    Json(json!({"name": "Silver", "price": up.spec.silver_usd, "symbol": "XAG"})).into_response()
}

async fn forex(State(up): State<Upstream>) -> Response {
    up.hits.forex.fetch_add(1, Ordering::SeqCst);
    if up.spec.forex_status != StatusCode::OK {
        return up.spec.forex_status.into_response();
    }
    Html(up.spec.forex_html.clone()).into_response()
}

async fn rate_api(State(up): State<Upstream>) -> Response {
    up.hits.rate_api.fetch_add(1, Ordering::SeqCst);
    if up.spec.rate_api_status != StatusCode::OK {
        return up.spec.rate_api_status.into_response();
    }
    Json(up.spec.rate_api_body.clone()).into_response()
}

/// Serve the fake gold-api, NRB page and rate API on an ephemeral local port.
/// Returns the base URL and the hit counters.
pub async fn spawn_upstream(spec: UpstreamSpec) -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/price/XAU", get(gold_price))
        .route("/price/XAG", get(silver_price))
        .route("/forex/", get(forex))
        .route("/v4/latest/USD", get(rate_api))
        .with_state(Upstream {
            spec,
            hits: hits.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake upstream");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), hits)
}

/// Config pointing every upstream at `base_url`, plus overrides
pub fn test_config(base_url: &str, overrides: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("GOLD_API_KEY".into(), TEST_API_KEY.into());
    vars.insert("GOLD_API_BASE_URL".into(), base_url.into());
    vars.insert("FOREX_PAGE_URL".into(), format!("{}/forex/", base_url));
    vars.insert("EXCHANGE_RATE_API_URL".into(), format!("{}/v4/latest/USD", base_url));
    vars.insert("PRICE_TIMEOUT_SECS".into(), "2".into());
    vars.insert("FOREX_PAGE_TIMEOUT_SECS".into(), "2".into());
    vars.insert("EXCHANGE_API_TIMEOUT_SECS".into(), "2".into());
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }

    AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("Invalid test config")
}

pub fn test_clock() -> ManualClock {
    ManualClock::new(DateTime::from_timestamp(START_TS, 0).unwrap())
}

pub fn test_router(config: &AppConfig, clock: &ManualClock) -> Router {
    let state = AppState::from_config(config, Arc::new(clock.clone()));
    build_router(state)
}

/// Issue a GET against the router and decode the JSON body
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();

    (status, json)
}
