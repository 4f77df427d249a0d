use thiserror::Error;

/// Credential acquisition and refresh failures.
///
/// None of these are fatal on their own — the provider retries under its
/// backoff policy until a human completes consent in the external auth UI or
/// the transient failure clears.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("persisted token is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("token refresh rejected with status {status}: {detail}")]
    RefreshRejected { status: u16, detail: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("credential acquisition abandoned after {0} attempts")]
    AttemptsExhausted(u32),
}
