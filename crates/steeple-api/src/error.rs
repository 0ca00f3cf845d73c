use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use steeple_ledger::LedgerError;
use steeple_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                LedgerError::InvalidIdentity(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_IDENTITY", "Invalid user ID".into())
                }
                LedgerError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "User not found".into()),
                LedgerError::AlreadyClaimed => (
                    StatusCode::BAD_REQUEST,
                    "ALREADY_CLAIMED",
                    "Daily bonus already claimed today".into(),
                ),
                LedgerError::StoreTimeout => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_TIMEOUT",
                    "The data store did not respond in time".into(),
                ),
                LedgerError::Store(e) => {
                    error!("Store error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STORE_UNAVAILABLE",
                        "The data store is unavailable".into(),
                    )
                }
                LedgerError::KeyGenerationExhausted => {
                    error!("Referral key generation exhausted");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "Failed to generate referral key".into(),
                    )
                }
            },
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
