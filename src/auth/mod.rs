//! Credential acquisition and refresh.
//!
//! This deployment has no interactive consent flow: the initial token is
//! produced by a separate web auth UI and shared through the token sink.
//! The provider's job is to surface a usable access token — loading the
//! persisted one, refreshing it when expired, and otherwise reporting
//! `Pending` so the caller backs off and retries until a human completes
//! consent elsewhere.

pub mod error;
pub mod token;

use chrono::{Duration, Utc};

pub use self::error::AuthError;
pub use self::token::{ClientApp, FileTokenStore, StoredToken, TokenSink};

use crate::retry::BackoffPolicy;

/// Outcome of one acquisition attempt.
#[derive(Debug)]
pub enum Acquisition {
    Valid(StoredToken),
    /// No usable token and no way to make one without external help.
    Pending,
}

/// Wire shape of a token refresh response.
#[derive(serde::Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Sole owner of the cached credentials. No other component reads or writes
/// the token sink.
pub struct CredentialProvider {
    sink: Box<dyn TokenSink>,
    client_app: Option<ClientApp>,
    http: reqwest::Client,
    backoff: BackoffPolicy,
    cached: Option<StoredToken>,
}

impl CredentialProvider {
    pub fn new(
        sink: Box<dyn TokenSink>,
        client_app: Option<ClientApp>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            sink,
            client_app,
            http: reqwest::Client::new(),
            backoff,
            cached: None,
        }
    }

    /// One pass of the acquisition state machine:
    /// Unloaded → Loaded → Valid | Expired → Refreshing → Valid | Failed.
    ///
    /// `Pending` means there is no token yet, or the one on disk is expired
    /// without refresh capability — the external auth UI has to act first.
    pub async fn acquire(&mut self) -> Result<Acquisition, AuthError> {
        if self.cached.is_none() {
            match self.sink.load().await? {
                Some(token) => {
                    tracing::info!("Loaded persisted credentials");
                    self.cached = Some(token);
                }
                None => {
                    tracing::info!("No persisted token; waiting for authentication via auth UI");
                    return Ok(Acquisition::Pending);
                }
            }
        }

        let token = match &self.cached {
            Some(t) => t.clone(),
            None => return Ok(Acquisition::Pending),
        };

        if !token.is_expired() {
            tracing::debug!("Persisted credentials are valid");
            return Ok(Acquisition::Valid(token));
        }

        if !self.can_refresh(&token) {
            tracing::warn!("Token is expired and has no refresh capability; waiting for re-authentication");
            // Drop the cache so the next attempt re-reads the sink — the auth
            // UI may replace the file at any time.
            self.cached = None;
            return Ok(Acquisition::Pending);
        }

        tracing::info!("Refreshing expired credentials");
        let refreshed = match self.refresh(&token).await {
            Ok(t) => t,
            Err(e) => {
                self.cached = None;
                return Err(e);
            }
        };

        self.sink.store(&refreshed).await?;
        tracing::info!("Credentials refreshed and persisted");
        self.cached = Some(refreshed.clone());
        Ok(Acquisition::Valid(refreshed))
    }

    /// Block until a valid token is available, sleeping under the backoff
    /// policy between attempts. Returns `Err` only when the policy's
    /// `max_attempts` test knob is set and exhausted.
    pub async fn wait_for_token(&mut self) -> Result<StoredToken, AuthError> {
        let policy = self.backoff.clone();
        let mut backoff = policy.start();
        let mut attempts: u32 = 0;

        loop {
            match self.acquire().await {
                Ok(Acquisition::Valid(token)) => return Ok(token),
                Ok(Acquisition::Pending) => {}
                Err(e) => tracing::error!("Credential acquisition failed: {}", e),
            }

            attempts = attempts.saturating_add(1);
            let delay = match backoff.next_delay() {
                Some(d) => d,
                None => return Err(AuthError::AttemptsExhausted(attempts)),
            };
            tracing::info!(
                "Waiting for valid credentials... retrying in {:.1}s",
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Forget the cached token so the next acquisition starts from the sink.
    /// Called when the remote API rejects the held token.
    pub fn invalidate(&mut self) {
        tracing::warn!("Cached credentials invalidated");
        self.cached = None;
    }

    fn can_refresh(&self, token: &StoredToken) -> bool {
        token.refresh_token.is_some()
            && (token.client_id.is_some() && token.client_secret.is_some()
                || self.client_app.is_some())
    }

    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, AuthError> {
        let refresh_token = match &token.refresh_token {
            Some(rt) => rt.as_str(),
            None => {
                return Err(AuthError::RefreshRejected {
                    status: 0,
                    detail: "no refresh token".into(),
                })
            }
        };
        // The persisted token wins; the configured client app fills gaps.
        let client_id = token
            .client_id
            .as_deref()
            .or(self.client_app.as_ref().map(|a| a.client_id.as_str()))
            .unwrap_or_default();
        let client_secret = token
            .client_secret
            .as_deref()
            .or(self.client_app.as_ref().map(|a| a.client_secret.as_str()))
            .unwrap_or_default();
        let token_uri = token
            .token_uri
            .as_deref()
            .or(self
                .client_app
                .as_ref()
                .and_then(|a| a.token_uri.as_deref()))
            .unwrap_or(token::DEFAULT_TOKEN_URI);

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.http.post(token_uri).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                detail,
            });
        }

        let body: RefreshResponse = response.json().await?;
        let mut refreshed = token.clone();
        refreshed.token = body.access_token;
        refreshed.expiry = Some(Utc::now() + Duration::seconds(body.expires_in));
        if body.refresh_token.is_some() {
            refreshed.refresh_token = body.refresh_token;
        }
        Ok(refreshed)
    }
}
