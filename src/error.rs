//! Service error taxonomy and its HTTP mapping.
//!
//! Store unavailability is deliberately absent: the store adapter falls
//! back to the in-memory mirror and callers only ever observe success.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("phone number already registered")]
    PhoneTaken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExchangeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ExchangeError::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ExchangeError::Validation(_)
            | ExchangeError::PhoneTaken
            | ExchangeError::InsufficientFunds => StatusCode::BAD_REQUEST,
            ExchangeError::NotFound(_) => StatusCode::NOT_FOUND,
            ExchangeError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ExchangeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal detail is logged, never returned to the client.
        let message = if let ExchangeError::Internal(detail) = &self {
            tracing::error!(%detail, "unhandled internal error");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
