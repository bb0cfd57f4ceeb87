//! Authentication error types.

use backoffice_core::error::BackofficeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("session has expired")]
    SessionExpired,

    #[error("invalid session")]
    SessionInvalid,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for BackofficeError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::SessionExpired
            | AuthError::SessionInvalid => BackofficeError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::PasswordTooShort { .. } => BackofficeError::Validation {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => BackofficeError::Crypto(msg),
        }
    }
}
