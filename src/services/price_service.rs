use crate::models::prices::PricesResponse;
use crate::services::aggregator::PriceAggregator;
use crate::services::response_cache::ResponseCache;

/// Prices payload served through the response cache
#[derive(Clone)]
pub struct PriceService {
    aggregator: PriceAggregator,
    cache: ResponseCache,
}

impl PriceService {
    pub fn new(aggregator: PriceAggregator, cache: ResponseCache) -> Self {
        Self { aggregator, cache }
    }

    pub async fn get_prices(&self) -> PricesResponse {
        self.cache
            .get_or_build(|| self.aggregator.build_quote())
            .await
    }
}
