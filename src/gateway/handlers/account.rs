//! Login and user balance endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};

use super::super::extract::Json;
use super::super::state::AppState;
use super::super::types::{BalancesView, LoginRequest, UserView};
use crate::error::Result;
use crate::models::Transaction;

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserView>> {
    let user = state
        .accounts
        .login_or_register(&req.phone, req.password.as_deref(), req.is_register)
        .await?;
    Ok(Json(user.into()))
}

/// GET /api/user/{user_id}
pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<BalancesView>> {
    let user = state.accounts.get_user(&user_id).await?;
    Ok(Json(user.into()))
}

/// GET /api/user/{user_id}/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<Vec<Transaction>> {
    Json(state.ledger.history(&user_id).await)
}
