//! Persisted OAuth token model and its storage sink.
//!
//! The on-disk format matches Google's "authorized user" JSON so the token
//! file can be shared with the external consent UI: whichever side refreshes
//! or re-authorizes last writes the file, and the other picks it up.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A token within this margin of its expiry is treated as already expired,
/// so a refresh happens before the remote API would reject it mid-flight.
const REFRESH_MARGIN_SECS: i64 = 60;

/// OAuth credentials as persisted by the token sink.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl StoredToken {
    /// A token with no recorded expiry must be refreshed before first use.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + Duration::seconds(REFRESH_MARGIN_SECS) >= expiry,
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

/// OAuth client application identity, from the client secret JSON.
/// Used to fill in refresh parameters a persisted token omits.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientApp {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    #[serde(default)]
    installed: Option<ClientApp>,
    #[serde(default)]
    web: Option<ClientApp>,
}

/// Parse a Google client secret JSON blob (either `installed` or `web` app).
pub fn parse_client_secret(raw: &str) -> Result<Option<ClientApp>, serde_json::Error> {
    let file: ClientSecretFile = serde_json::from_str(raw)?;
    Ok(file.installed.or(file.web))
}

/// Pluggable persistence for credentials. The provider writes through this
/// after every successful refresh so a restart resumes from Loaded state.
#[async_trait]
pub trait TokenSink: Send + Sync {
    async fn load(&self) -> Result<Option<StoredToken>, AuthError>;
    async fn store(&self, token: &StoredToken) -> Result<(), AuthError>;
}

/// File-backed token sink (the default deployment: a JSON file shared with
/// the auth UI).
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenSink for FileTokenStore {
    async fn load(&self) -> Result<Option<StoredToken>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let token = serde_json::from_str(&contents)?;
        tracing::debug!("Loaded token from {}", self.path.display());
        Ok(Some(token))
    }

    async fn store(&self, token: &StoredToken) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.path, json).await?;
        #[cfg(unix)]
        {
            // Token files hold refresh credentials — restrict to owner-only
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }
        tracing::debug!("Persisted token to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tokio::sync::Mutex;

    /// In-memory sink for provider tests.
    #[derive(Default)]
    pub struct MemoryTokenStore {
        pub token: Mutex<Option<StoredToken>>,
        pub store_count: std::sync::atomic::AtomicU32,
    }

    impl MemoryTokenStore {
        pub fn with_token(token: StoredToken) -> Self {
            Self {
                token: Mutex::new(Some(token)),
                store_count: std::sync::atomic::AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TokenSink for MemoryTokenStore {
        async fn load(&self) -> Result<Option<StoredToken>, AuthError> {
            Ok(self.token.lock().await.clone())
        }

        async fn store(&self, token: &StoredToken) -> Result<(), AuthError> {
            *self.token.lock().await = Some(token.clone());
            self.store_count
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }
}
