//! Route handlers and the shared error-to-response mapping.

pub mod confirm;
pub mod health;
pub mod register;
pub mod resend;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::registration::RegistrationError;

/// Map a registration failure to an HTTP response.
///
/// Caller-visible kinds carry their own message; internal failures are logged
/// and rendered generically.
pub(crate) fn error_response(err: &RegistrationError) -> Response {
    let status = match err {
        RegistrationError::InvalidEmail => StatusCode::BAD_REQUEST,
        RegistrationError::EmailTaken | RegistrationError::AlreadyConfirmed => {
            StatusCode::CONFLICT
        }
        RegistrationError::UserNotFound | RegistrationError::TokenNotFound => {
            StatusCode::NOT_FOUND
        }
        RegistrationError::TokenExpired => StatusCode::GONE,
        RegistrationError::Internal(source) => {
            error!("Registration request failed: {source:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
                .into_response();
        }
    };

    (status, err.to_string()).into_response()
}
