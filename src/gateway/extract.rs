//! Framework-level request extraction.
//!
//! Handlers never see a malformed body: deserialization failures are
//! turned into the service error taxonomy here, so clients get the same
//! `{"error": ...}` shape for a bad payload as for any validation error.

use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::ExchangeError;

/// Drop-in replacement for `axum::Json` whose rejection is an
/// `ExchangeError::Validation` (HTTP 400) instead of axum's plain-text
/// 415/422 responses.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ExchangeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(ExchangeError::Validation(rejection.body_text())),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
