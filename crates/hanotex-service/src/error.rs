//! Error types for hanotexd

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hanotex_core::error::{ConfirmError, DocumentError, ProfileError, StoreError};
use hanotex_core::notify::NotifyError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub const MSG_ALREADY_ACCEPTED: &str = "User has already accepted this contract";
pub const MSG_NOT_A_PARTY: &str = "User is not a party to this contract";
pub const MSG_CONTRACT_NOT_FOUND: &str = "Contract not found";
pub const MSG_INTERNAL: &str = "Internal server error";

/// Startup and lifecycle errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Notification setup error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Invalid workflow profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request errors, rendered as `{ "error": message }`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "request failed");
        Self::Internal(MSG_INTERNAL.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConfirmError> for ApiError {
    fn from(err: ConfirmError) -> Self {
        match err {
            ConfirmError::InvalidRequest(message) => Self::BadRequest(message),
            ConfirmError::NotFound(_) => Self::NotFound(MSG_CONTRACT_NOT_FOUND.to_string()),
            ConfirmError::Forbidden { .. } => Self::Forbidden(MSG_NOT_A_PARTY.to_string()),
            ConfirmError::AlreadyConfirmed { .. } => {
                Self::BadRequest(MSG_ALREADY_ACCEPTED.to_string())
            }
            ConfirmError::Internal(detail) => Self::internal(detail),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(message) => Self::NotFound(message),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::InvalidData(message) => Self::BadRequest(message),
            other => Self::internal(other),
        }
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use hanotex_core::ids::{ContractId, UserId};

    #[test]
    fn confirm_errors_map_to_fixed_messages() {
        let forbidden: ApiError = ConfirmError::Forbidden {
            contract_id: ContractId::new("c-1"),
            user_id: UserId::new("U3"),
        }
        .into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.to_string(), MSG_NOT_A_PARTY);

        let duplicate: ApiError = ConfirmError::AlreadyConfirmed {
            contract_id: ContractId::new("c-1"),
            user_id: UserId::new("U1"),
        }
        .into();
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
        assert_eq!(duplicate.to_string(), MSG_ALREADY_ACCEPTED);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err: ApiError = StoreError::Connection("password=hunter2".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), MSG_INTERNAL);
    }
}
