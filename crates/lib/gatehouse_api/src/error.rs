//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatehouse_core::auth::{AuthError, PERMISSION_DENIED};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// The single 401 every missing, unknown, expired or rejected token or
    /// login produces.
    pub fn permission_denied() -> Self {
        AppError::Unauthorized(PERMISSION_DENIED.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Internal(detail) => {
                error!(%detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials(_)
            | AuthError::InsufficientCredentials(_)
            | AuthError::Unauthorized
            | AuthError::ReauthenticationFailed => AppError::permission_denied(),
            AuthError::SessionNotFound => AppError::NotFound(AuthError::SessionNotFound.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_collapse_to_one_message() {
        for e in [
            AuthError::InvalidCredentials("bad password".into()),
            AuthError::InsufficientCredentials("need otp".into()),
            AuthError::Unauthorized,
            AuthError::ReauthenticationFailed,
        ] {
            match AppError::from(e) {
                AppError::Unauthorized(m) => assert_eq!(m, PERMISSION_DENIED),
                other => panic!("unexpected mapping: {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_token_on_logout_is_not_found() {
        match AppError::from(AuthError::SessionNotFound) {
            AppError::NotFound(m) => assert_eq!(m, "No such token."),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn statuses() {
        assert_eq!(
            AppError::permission_denied().into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
