//! Prometheus observability for the playlist daemon.
//!
//! Thin wrappers over the `metrics` facade so call sites stay one-liners and
//! metric names live in one place. When no exporter is installed (tests, or
//! a failed port bind) every emission is a no-op.

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const VIDEOS_PROCESSED: &str = "yt_playlist_videos_processed_total";
pub const DOWNLOADS: &str = "yt_playlist_downloads_total";
pub const API_CALLS: &str = "yt_playlist_api_calls_total";
pub const QUOTA_USED: &str = "yt_playlist_api_quota_used";
pub const QUOTA_REMAINING: &str = "yt_playlist_api_quota_remaining";
pub const TODO_VIDEOS: &str = "yt_playlist_todo_videos";
pub const PROCESSING_DURATION: &str = "yt_playlist_processing_duration_seconds";
pub const LAST_CYCLE_TIMESTAMP: &str = "yt_playlist_last_processing_timestamp";

/// Install the Prometheus scrape endpoint and register metric descriptions.
///
/// Called once at startup. A bind failure is surfaced to the caller, which
/// logs and continues — the daemon is fully functional without metrics.
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        VIDEOS_PROCESSED,
        Unit::Count,
        "Total number of videos processed, by outcome"
    );
    describe_counter!(
        DOWNLOADS,
        Unit::Count,
        "Total number of video downloads attempted, by status"
    );
    describe_counter!(
        API_CALLS,
        Unit::Count,
        "Total number of YouTube API calls, by operation"
    );
    describe_gauge!(
        QUOTA_USED,
        Unit::Count,
        "Estimated YouTube API quota units used today"
    );
    describe_gauge!(
        QUOTA_REMAINING,
        Unit::Count,
        "Estimated YouTube API quota units remaining today"
    );
    describe_gauge!(
        TODO_VIDEOS,
        Unit::Count,
        "Current number of videos in the todo playlist"
    );
    describe_histogram!(
        PROCESSING_DURATION,
        Unit::Seconds,
        "Time spent processing, by operation"
    );
    describe_gauge!(
        LAST_CYCLE_TIMESTAMP,
        Unit::Seconds,
        "Unix timestamp of the last processing cycle"
    );

    Ok(())
}

pub fn record_api_call(operation: &'static str) {
    counter!(API_CALLS, "operation" => operation).increment(1);
}

pub fn record_processed(status: &'static str) {
    counter!(VIDEOS_PROCESSED, "status" => status).increment(1);
}

pub fn record_download(status: &'static str) {
    counter!(DOWNLOADS, "status" => status).increment(1);
}

pub fn set_quota_gauges(used: u32, remaining: u32) {
    gauge!(QUOTA_USED).set(used as f64);
    gauge!(QUOTA_REMAINING).set(remaining as f64);
}

pub fn set_todo_videos(count: usize) {
    gauge!(TODO_VIDEOS).set(count as f64);
}

pub fn record_duration(operation: &'static str, seconds: f64) {
    histogram!(PROCESSING_DURATION, "operation" => operation).record(seconds);
}

pub fn mark_cycle_complete() {
    gauge!(LAST_CYCLE_TIMESTAMP).set(chrono::Utc::now().timestamp() as f64);
}
