//! Public order endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};

use super::super::extract::Json;
use super::super::state::AppState;
use super::super::types::{CreateOrderRequest, CreateOrderResponse, OrderStatusView};
use crate::error::Result;

/// POST /api/create-order
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    let order = state
        .orders
        .create(req.direction, req.amount, &req.card_number)
        .await?;
    Ok(Json(order.into()))
}

/// GET /api/order/{order_id}
///
/// Evaluates lazy expiry before answering.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderStatusView>> {
    let order = state.orders.get_status(&order_id).await?;
    Ok(Json(order.into()))
}
