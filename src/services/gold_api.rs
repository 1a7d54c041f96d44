use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::FetchError;
use crate::models::prices::{AssetKind, SpotPrice};
use crate::services::conversion::round_dp;

/// Anything that can quote a USD spot price for a metal.
#[async_trait]
pub trait SpotPriceSource: Send + Sync {
    async fn fetch_spot(&self, asset: AssetKind) -> Result<SpotPrice, FetchError>;
}

/// Client for the gold-api.com spot endpoints (`/price/XAU`, `/price/XAG`)
#[derive(Clone)]
pub struct GoldApiService {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

// gold-api.com responds with `{"price": ...}`; some plans wrap it as
// `{"data": {"amount": ...}}`.
#[derive(Debug, Deserialize)]
struct SpotPriceResponse {
    price: Option<f64>,
    data: Option<SpotPriceData>,
}

#[derive(Debug, Deserialize)]
struct SpotPriceData {
    amount: Option<f64>,
}

impl SpotPriceResponse {
    fn usd(&self) -> Option<f64> {
        self.price
            .or_else(|| self.data.as_ref().and_then(|d| d.amount))
    }
}

impl GoldApiService {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn price_url(&self, asset: AssetKind) -> String {
        format!("{}/price/{}", self.base_url, asset.symbol())
    }

    /// Live reachability check used by the health endpoint. Never fails.
    pub async fn probe(&self, asset: AssetKind) -> String {
        let result = self
            .client
            .get(self.price_url(asset))
            .header("x-api-key", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => "working".to_string(),
            Ok(response) => format!("failed: {}", response.status().as_u16()),
            Err(e) => format!("connection failed: {}", e),
        }
    }
}

#[async_trait]
impl SpotPriceSource for GoldApiService {
    async fn fetch_spot(&self, asset: AssetKind) -> Result<SpotPrice, FetchError> {
        let url = self.price_url(asset);
        tracing::debug!("Fetching {} spot price from {}", asset, url);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: SpotPriceResponse = response.json().await?;

        let usd = body
            .usd()
            .ok_or_else(|| FetchError::InvalidData(format!("no price field in {} response", asset)))?;

        if !usd.is_finite() || usd <= 0.0 {
            return Err(FetchError::InvalidData(format!("{} price {} is not positive", asset, usd)));
        }

        let precision = asset.precision();
        let usd_per_ounce = round_dp("spot_usd", usd, precision)
            .map_err(|e| FetchError::InvalidData(e.to_string()))?;

        tracing::debug!("Got {} spot price: ${}", asset, usd_per_ounce);

        Ok(SpotPrice {
            asset,
            usd_per_ounce,
            precision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_url_per_asset() {
        let service = GoldApiService::new(
            "key".to_string(),
            "https://api.gold-api.com/".to_string(),
            Duration::from_secs(5),
        );
        assert_eq!(service.price_url(AssetKind::Gold), "https://api.gold-api.com/price/XAU");
        assert_eq!(service.price_url(AssetKind::Silver), "https://api.gold-api.com/price/XAG");
    }

    #[test]
    fn test_response_shapes() {
        let flat: SpotPriceResponse = serde_json::from_str(r#"{"price": 2412.3, "symbol": "XAU"}"#).unwrap();
        assert_eq!(flat.usd(), Some(2412.3));

        let wrapped: SpotPriceResponse = serde_json::from_str(r#"{"data": {"amount": 29.417}}"#).unwrap();
        assert_eq!(wrapped.usd(), Some(29.417));

        let empty: SpotPriceResponse = serde_json::from_str(r#"{"error": "invalid key"}"#).unwrap();
        assert_eq!(empty.usd(), None);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_an_error_not_a_panic() {
        // Port 9 (discard) on localhost is closed in test environments
        let service = GoldApiService::new(
            "key".to_string(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(1),
        );
        assert!(service.fetch_spot(AssetKind::Gold).await.is_err());
        assert!(service.probe(AssetKind::Gold).await.starts_with("connection failed"));
    }

    #[tokio::test]
    async fn test_request_timeout_maps_to_timeout_error() {
        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let service = GoldApiService::new(
            "key".to_string(),
            format!("http://{}", addr),
            Duration::from_millis(200),
        );

        let err = service.fetch_spot(AssetKind::Gold).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
    }
}
