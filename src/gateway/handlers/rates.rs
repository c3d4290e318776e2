//! Rate endpoints.

use std::sync::Arc;

use axum::extract::State;

use super::super::extract::Json;
use super::super::state::AppState;
use super::super::types::{RatesView, SetRatesRequest, SetRatesResponse};
use crate::error::Result;

/// GET /api/rates
pub async fn get_rates(State(state): State<Arc<AppState>>) -> Json<RatesView> {
    Json(state.rates.get().await.into())
}

/// POST /api/rates
pub async fn set_rates(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetRatesRequest>,
) -> Result<Json<SetRatesResponse>> {
    let rate = state.rates.set(req.usdt, req.ton).await?;
    Ok(Json(SetRatesResponse {
        success: true,
        rates: rate.into(),
    }))
}
