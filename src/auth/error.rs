use axum::{http::StatusCode, Json};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::i18n::message;

/// Failures surfaced by credential and token operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Reset code unknown, already consumed, or past its expiry.
    #[error("invalid or expired reset token")]
    InvalidToken,
    /// Candidate password broke a policy rule; the payload is the
    /// first rule it violated.
    #[error("{0}")]
    WeakPassword(String),
    #[error("user not found")]
    UserNotFound,
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("account is inactive")]
    InactiveUser,
    #[error("invalid email address")]
    InvalidEmail,
    #[error("email already registered")]
    EmailTaken,
    #[error("email delivery failed: {0}")]
    Delivery(anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// JSON error payload, `{"detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

impl AuthError {
    /// Maps the failure onto an HTTP status and a body localized for
    /// `language`. Internal causes are logged here and never leak.
    pub fn into_api(self, language: &str) -> ApiError {
        match self {
            AuthError::InvalidToken => api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                message(language, "invalid_token"),
            ),
            AuthError::WeakPassword(detail) => {
                api_error(StatusCode::UNPROCESSABLE_ENTITY, detail)
            }
            AuthError::UserNotFound => {
                api_error(StatusCode::NOT_FOUND, message(language, "user_not_found"))
            }
            AuthError::InvalidCredentials => api_error(
                StatusCode::UNAUTHORIZED,
                message(language, "invalid_credentials"),
            ),
            AuthError::InactiveUser => api_error(
                StatusCode::UNAUTHORIZED,
                message(language, "inactive_user"),
            ),
            AuthError::InvalidEmail => api_error(StatusCode::BAD_REQUEST, "Invalid email"),
            AuthError::EmailTaken => {
                api_error(StatusCode::BAD_REQUEST, message(language, "email_exists"))
            }
            AuthError::Delivery(e) => {
                error!(error = %e, "password recovery email failed");
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message(language, "email_send_error"),
                )
            }
            AuthError::Internal(e) => {
                error!(error = %e, "internal auth error");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}
