//! Authentication Errors
//! Mission: One taxonomy for every auth failure, mapped to a status and a terse body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Every failure the auth core can surface.
///
/// Store operations translate `rusqlite` errors into these variants at their
/// boundary, so handlers never see a raw database error.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid role")]
    InvalidRole,
    #[error("email already registered")]
    DuplicateIdentity,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("record not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AuthError::Hashing(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(e: tokio::task::JoinError) -> Self {
        AuthError::Hashing(e.to_string())
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidInput(_) | AuthError::InvalidRole | AuthError::DuplicateIdentity => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Storage(_) | AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body. Never includes internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::InvalidInput(_) => "bad request",
            AuthError::InvalidRole => "invalid role",
            AuthError::DuplicateIdentity => "could not create user",
            AuthError::InvalidCredentials => "invalid credentials",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Forbidden => "forbidden",
            AuthError::NotFound => "not found",
            AuthError::Storage(_) | AuthError::Hashing(_) => "internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Auth internal error: {}", self);
        }

        (status, self.public_message()).into_response()
    }
}

/// True when a rusqlite error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
