use thiserror::Error;

/// Stable error taxonomy for the authentication core.
///
/// Every fallible operation in this crate returns one of these variants;
/// callers are expected to match on `kind` rather than the message text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("already registered")]
    AlreadyRegistered,

    #[error("not registered")]
    NotRegistered,

    #[error("insufficient shares: collected {collected}, need {threshold}")]
    InsufficientShares { collected: usize, threshold: usize },

    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    #[error("session expired")]
    SessionExpired,

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl AuthError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AuthError::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        AuthError::ConfigError(msg.into())
    }

    pub fn auth_failure(msg: impl Into<String>) -> Self {
        AuthError::AuthenticationFailure(msg.into())
    }

    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        AuthError::BackendUnavailable(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
