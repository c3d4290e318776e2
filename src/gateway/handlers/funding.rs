//! Deposit and withdrawal endpoints.

use std::sync::Arc;

use axum::extract::State;

use super::super::extract::Json;
use super::super::state::AppState;
use super::super::types::{
    DepositConfirmRequest, DepositConfirmResponse, DepositRequest, DepositRequestResponse,
    WithdrawRequest, WithdrawResponse,
};
use crate::error::Result;

/// POST /api/deposit/request
pub async fn request_deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<DepositRequestResponse>> {
    let tx = state.ledger.request_deposit(&req.user_id, req.amount).await?;
    Ok(Json(DepositRequestResponse {
        success: true,
        message: "deposit request created".to_string(),
        transaction: tx,
    }))
}

/// POST /api/deposit/confirm
pub async fn confirm_deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DepositConfirmRequest>,
) -> Result<Json<DepositConfirmResponse>> {
    let user = state
        .ledger
        .confirm_deposit(&req.user_id, req.amount, &req.tx_hash)
        .await?;
    Ok(Json(DepositConfirmResponse {
        success: true,
        balance: user.balance_usdt,
    }))
}

/// POST /api/withdraw
pub async fn request_withdraw(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>> {
    let tx = state
        .ledger
        .request_withdraw(&req.user_id, req.amount, &req.card)
        .await?;
    Ok(Json(WithdrawResponse {
        success: true,
        transaction: tx,
    }))
}
