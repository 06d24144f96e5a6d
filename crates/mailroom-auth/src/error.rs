//! Authentication error types.

use mailroom_core::error::MailroomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, inactive account, and wrong password all collapse
    /// into this one variant.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session not found")]
    SessionNotFound,

    #[error("session has expired")]
    SessionExpired,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for MailroomError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => MailroomError::InvalidCredentials,
            AuthError::SessionNotFound | AuthError::SessionExpired => {
                MailroomError::Unauthenticated
            }
            AuthError::Crypto(msg) => MailroomError::Crypto(msg),
        }
    }
}
