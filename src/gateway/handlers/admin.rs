//! Operator endpoints: read-only projections of the ledger plus the
//! manual settlement mutations. All routes here sit behind the admin
//! token middleware.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use super::super::state::AppState;
use super::super::types::{StatsView, SuccessResponse};
use crate::error::Result;
use crate::models::{Order, Transaction, User};

/// GET /api/admin/orders
pub async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    Json(state.orders.list().await)
}

/// GET /api/admin/users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    Json(state.store.list_users().await)
}

/// GET /api/admin/transactions
pub async fn list_transactions(State(state): State<Arc<AppState>>) -> Json<Vec<Transaction>> {
    Json(state.ledger.list().await)
}

/// POST /api/admin/order/{order_id}/confirm
pub async fn confirm_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.orders.confirm(&order_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/admin/order/{order_id}/received
pub async fn mark_order_received(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.orders.mark_received(&order_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/admin/order/{order_id}/cancel
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.orders.cancel(&order_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/admin/deposit/{tx_id}/confirm
pub async fn confirm_deposit(
    State(state): State<Arc<AppState>>,
    Path(tx_id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.ledger.confirm_deposit_by_id(&tx_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/admin/withdraw/{tx_id}/confirm
pub async fn confirm_withdraw(
    State(state): State<Arc<AppState>>,
    Path(tx_id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.ledger.confirm_withdraw(&tx_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/admin/withdraw/{tx_id}/reject
///
/// Reconciliation for debit-on-request: returns the held funds.
pub async fn reject_withdraw(
    State(state): State<Arc<AppState>>,
    Path(tx_id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.ledger.reject_withdraw(&tx_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/stats (public, cosmetic counters)
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsView> {
    let rates = state.rates.get().await;
    Json(StatsView {
        users: state.store.list_users().await.len(),
        orders: state.store.list_orders().await.len(),
        transactions: state.store.list_transactions().await.len(),
        rates: rates.into(),
        store: state.store.health().as_str(),
    })
}
