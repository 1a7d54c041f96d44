use axum::{extract::State, Json};

use crate::models::prices::PricesResponse;
use crate::AppState;

/// Handler for GET /api/prices/
/// Always 200: a failed aggregation is reported through `status: "error"`
pub async fn get_prices(State(state): State<AppState>) -> Json<PricesResponse> {
    Json(state.prices.get_prices().await)
}
