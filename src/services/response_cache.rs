use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::models::prices::PricesResponse;
use crate::services::clock::{is_fresh, Clock};

#[derive(Debug, Clone)]
struct CachedResponse {
    payload: PricesResponse,
    generated_at: DateTime<Utc>,
}

/// Single-slot cache for the whole prices payload
#[derive(Clone)]
pub struct ResponseCache {
    slot: Arc<RwLock<Option<CachedResponse>>>,
    freshness: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(freshness: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
            freshness,
            clock,
        }
    }

    /// Return the stored payload while it is fresh, otherwise run `build`
    /// and store whatever it returns (error payloads included).
    pub async fn get_or_build<F, Fut>(&self, build: F) -> PricesResponse
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PricesResponse>,
    {
        if let Some(payload) = self.fresh() {
            tracing::debug!("Returning cached prices response");
            return payload;
        }

        // Lock is not held across the build; racing misses both rebuild
        let payload = build().await;

        *self.slot.write() = Some(CachedResponse {
            payload: payload.clone(),
            generated_at: self.clock.now(),
        });

        payload
    }

    fn fresh(&self) -> Option<PricesResponse> {
        let slot = self.slot.read();
        slot.as_ref()
            .filter(|cached| is_fresh(self.clock.now(), cached.generated_at, self.freshness))
            .map(|cached| cached.payload.clone())
    }
}
