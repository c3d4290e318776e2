//! HTTP gateway: router, shared state and the admin token gate.

pub mod extract;
pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::error::ExchangeError;
use state::AppState;

/// Axum middleware guarding the operator surface. Accepts
/// `Authorization: Bearer <token>` or `x-admin-token: <token>`; rejects
/// everything while no token is configured.
async fn admin_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ExchangeError> {
    let expected = state
        .admin_token
        .as_deref()
        .ok_or(ExchangeError::InvalidCredentials)?;

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| {
            request
                .headers()
                .get("x-admin-token")
                .and_then(|v| v.to_str().ok())
        });

    match provided {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(ExchangeError::InvalidCredentials),
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/orders", get(handlers::admin::list_orders))
        .route("/users", get(handlers::admin::list_users))
        .route("/transactions", get(handlers::admin::list_transactions))
        .route(
            "/order/{order_id}/confirm",
            post(handlers::admin::confirm_order),
        )
        .route(
            "/order/{order_id}/received",
            post(handlers::admin::mark_order_received),
        )
        .route(
            "/order/{order_id}/cancel",
            post(handlers::admin::cancel_order),
        )
        .route(
            "/deposit/{tx_id}/confirm",
            post(handlers::admin::confirm_deposit),
        )
        .route(
            "/withdraw/{tx_id}/confirm",
            post(handlers::admin::confirm_withdraw),
        )
        .route(
            "/withdraw/{tx_id}/reject",
            post(handlers::admin::reject_withdraw),
        )
        .layer(from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .route(
            "/api/rates",
            get(handlers::rates::get_rates).post(handlers::rates::set_rates),
        )
        .route("/api/login", post(handlers::account::login))
        .route("/api/user/{user_id}", get(handlers::account::get_balances))
        .route(
            "/api/user/{user_id}/history",
            get(handlers::account::get_history),
        )
        .route(
            "/api/deposit/request",
            post(handlers::funding::request_deposit),
        )
        .route(
            "/api/deposit/confirm",
            post(handlers::funding::confirm_deposit),
        )
        .route("/api/withdraw", post(handlers::funding::request_withdraw))
        .route("/api/create-order", post(handlers::order::create_order))
        .route("/api/order/{order_id}", get(handlers::order::get_order))
        .route("/api/stats", get(handlers::admin::stats))
        .nest("/api/admin", admin_routes)
        .with_state(state)
}

/// Bind and serve the gateway.
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
