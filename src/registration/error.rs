use thiserror::Error;

/// Failures surfaced by registration and confirmation.
///
/// Every variant except `Internal` is a caller-visible outcome and carries no
/// identifiers or secrets, so it can be rendered directly.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("email not valid")]
    InvalidEmail,
    #[error("email already taken")]
    EmailTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("token not found")]
    TokenNotFound,
    #[error("email already confirmed")]
    AlreadyConfirmed,
    #[error("token expired")]
    TokenExpired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RegistrationError {
    /// Stable machine-readable name for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "invalid_email",
            Self::EmailTaken => "email_taken",
            Self::UserNotFound => "user_not_found",
            Self::TokenNotFound => "token_not_found",
            Self::AlreadyConfirmed => "already_confirmed",
            Self::TokenExpired => "token_expired",
            Self::Internal(_) => "internal",
        }
    }
}

pub type Result<T, E = RegistrationError> = std::result::Result<T, E>;
