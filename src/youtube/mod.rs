//! YouTube Data API v3 playlist client.
//!
//! Wraps the three `playlistItems` operations (list, insert, delete) behind
//! the [`PlaylistApi`] trait so the orchestrator can run against an
//! in-memory fake. Every call attempt is charged against the quota tracker
//! and counted in metrics before its outcome is known — the remote API
//! bills per call, not per success.

pub mod error;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

pub use self::error::ApiError;
pub use self::types::PlaylistVideo;

use self::types::PlaylistItemsPage;
use crate::auth::CredentialProvider;
use crate::quota::{ApiOperation, QuotaTracker};
use crate::retry::{retry_with_backoff, RetryAction, RetryConfig};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Server-side page size for playlist listing.
const PAGE_SIZE: &str = "50";

/// The remote playlist operations the orchestrator depends on.
///
/// `list_items` degrades to an empty vec on failure — the cycle treats
/// "nothing to do" and "playlist unreachable" identically so a fixable
/// misconfiguration never crashes the daemon. Insert and delete surface
/// failures as `Err` for the orchestrator to aggregate, never panics.
#[async_trait]
pub trait PlaylistApi: Send + Sync {
    async fn list_items(&self, playlist_id: &str) -> Vec<PlaylistVideo>;
    async fn insert_item(&self, playlist_id: &str, video_id: &str) -> Result<(), ApiError>;
    async fn delete_item(&self, playlist_item_id: &str) -> Result<(), ApiError>;
}

pub struct PlaylistClient {
    http: reqwest::Client,
    base_url: String,
    provider: Mutex<CredentialProvider>,
    quota: Arc<Mutex<QuotaTracker>>,
    page_retry: RetryConfig,
}

impl PlaylistClient {
    pub fn new(provider: CredentialProvider, quota: Arc<Mutex<QuotaTracker>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            provider: Mutex::new(provider),
            quota,
            page_retry: RetryConfig::default(),
        }
    }

    /// Point the client at a different API root (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page_retry(mut self, page_retry: RetryConfig) -> Self {
        self.page_retry = page_retry;
        self
    }

    /// A valid bearer token, refreshing or backing off as needed.
    /// Acquisition is a blocking prerequisite to any remote call.
    async fn bearer(&self) -> Result<String, ApiError> {
        let mut provider = self.provider.lock().await;
        Ok(provider.wait_for_token().await?.token)
    }

    /// Charge one call attempt before issuing it.
    async fn charge(&self, op: ApiOperation) {
        self.quota.lock().await.record(op);
        crate::metrics::record_api_call(op.as_str());
    }

    async fn check_status(
        &self,
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 {
            self.provider.lock().await.invalidate();
        }
        let detail = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            operation,
            status: status.as_u16(),
            detail,
        })
    }

    async fn fetch_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage, ApiError> {
        self.charge(ApiOperation::List).await;
        let token = self.bearer().await?;

        let mut request = self
            .http
            .get(format!("{}/playlistItems", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", PAGE_SIZE),
            ]);
        if let Some(pt) = page_token {
            request = request.query(&[("pageToken", pt)]);
        }

        let response = request.send().await?;
        let response = self.check_status("playlistItems.list", response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PlaylistApi for PlaylistClient {
    async fn list_items(&self, playlist_id: &str) -> Vec<PlaylistVideo> {
        tracing::info!("Fetching videos from playlist {}", playlist_id);

        let mut videos: Vec<PlaylistVideo> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let result = retry_with_backoff(
                &self.page_retry,
                |e: &ApiError| {
                    if e.is_transient() {
                        RetryAction::Retry
                    } else {
                        RetryAction::Abort
                    }
                },
                || self.fetch_page(playlist_id, page_token.as_deref()),
            )
            .await;

            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!("Failed to fetch playlist {}: {}", playlist_id, e);
                    if e.status() == Some(404) {
                        tracing::error!(
                            "Playlist not found — check the ID, its visibility, and that it \
                             still exists: https://www.youtube.com/playlist?list={}",
                            playlist_id
                        );
                    }
                    return Vec::new();
                }
            };

            for item in page.items {
                videos.push(PlaylistVideo::new(
                    item.id,
                    item.snippet.resource_id.video_id,
                    item.snippet.title,
                ));
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        tracing::info!(
            "Retrieved {} videos from playlist {}",
            videos.len(),
            playlist_id
        );
        crate::metrics::set_todo_videos(videos.len());
        videos
    }

    async fn insert_item(&self, playlist_id: &str, video_id: &str) -> Result<(), ApiError> {
        self.charge(ApiOperation::Insert).await;
        let token = self.bearer().await?;

        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id,
                }
            }
        });

        let result = async {
            let response = self
                .http
                .post(format!("{}/playlistItems", self.base_url))
                .bearer_auth(token)
                .query(&[("part", "snippet")])
                .json(&body)
                .send()
                .await?;
            self.check_status("playlistItems.insert", response).await
        }
        .await;

        match result {
            Ok(_) => {
                tracing::info!("Added video {} to playlist {}", video_id, playlist_id);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "Failed to add video {} to playlist {}: {}",
                    video_id,
                    playlist_id,
                    e
                );
                Err(e)
            }
        }
    }

    async fn delete_item(&self, playlist_item_id: &str) -> Result<(), ApiError> {
        self.charge(ApiOperation::Delete).await;
        let token = self.bearer().await?;

        let result = async {
            let response = self
                .http
                .delete(format!("{}/playlistItems", self.base_url))
                .bearer_auth(token)
                .query(&[("id", playlist_item_id)])
                .send()
                .await?;
            self.check_status("playlistItems.delete", response).await
        }
        .await;

        match result {
            Ok(_) => {
                tracing::info!("Removed playlist item {}", playlist_item_id);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "Failed to remove playlist item {}: {}",
                    playlist_item_id,
                    e
                );
                Err(e)
            }
        }
    }
}
