//! HTTP request handlers

pub mod accept;
pub mod contracts;
pub mod health;
pub mod proposals;

use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::Json;

/// Unwrap a JSON extractor, reporting malformed bodies as `{ "error" }`.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
