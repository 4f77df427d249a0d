use thiserror::Error;

use crate::auth::AuthError;

/// Typed playlist API errors enabling retry classification.
///
/// `is_transient()` separates failures worth retrying within one page fetch
/// (rate limits, server errors, connection drops) from permanent ones
/// (missing playlist, revoked credentials) that the caller degrades on.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation} returned status {status}: {detail}")]
    Status {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("credential acquisition failed: {0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Http(_) => true,
            ApiError::Auth(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
