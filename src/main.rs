mod auth;
mod cli;
mod config;
mod download;
mod manager;
mod metrics;
mod quota;
mod retry;
mod shutdown;
mod types;
mod youtube;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tokio::sync::Mutex;

use crate::auth::token::parse_client_secret;
use crate::auth::{CredentialProvider, FileTokenStore};
use crate::config::Config;
use crate::download::{MediaFetcher, YtDlpFetcher};
use crate::manager::PlaylistManager;
use crate::quota::QuotaTracker;
use crate::retry::BackoffPolicy;
use crate::types::LogLevel;
use crate::youtube::{PlaylistApi, PlaylistClient};

fn init_tracing(level: LogLevel) {
    let default_directive = match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.log_level);

    let config = Config::from_cli(cli)?;
    tracing::info!(
        "Starting yt-playlist-manager (todo={}, done={}, mode={})",
        config.todo_playlist_id,
        config.done_playlist_id,
        config.download_mode.as_str()
    );

    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    match metrics::init_metrics(metrics_addr) {
        Ok(()) => tracing::info!("Metrics endpoint listening on {}", metrics_addr),
        // Metrics are optional: a busy port must not take the daemon down
        Err(e) => tracing::warn!("Metrics disabled: {}", e),
    }

    let secret_json = match &config.client_secret_json {
        Some(raw) => raw.clone(),
        None => tokio::fs::read_to_string(&config.credentials_file)
            .await
            .with_context(|| {
                format!(
                    "Failed to read credentials file {}",
                    config.credentials_file.display()
                )
            })?,
    };
    let client_app = parse_client_secret(&secret_json).context("Invalid client secret JSON")?;
    if client_app.is_none() {
        tracing::warn!(
            "Client secret has no 'installed' or 'web' section; refresh depends on the token file"
        );
    }

    let sink = FileTokenStore::new(&config.token_file);
    let mut provider = CredentialProvider::new(Box::new(sink), client_app, BackoffPolicy::default());

    tracing::info!("Acquiring initial credentials");
    provider
        .wait_for_token()
        .await
        .context("Credential acquisition failed")?;

    let quota = Arc::new(Mutex::new(QuotaTracker::new(config.daily_quota_limit)));
    let api: Arc<dyn PlaylistApi> = Arc::new(PlaylistClient::new(provider, quota.clone()));
    let fetcher: Arc<dyn MediaFetcher> = Arc::new(YtDlpFetcher::new(
        config.ytdlp_path.clone(),
        config.download_mode,
    ));

    let manager = Arc::new(PlaylistManager::new(
        api,
        fetcher,
        quota,
        config.todo_playlist_id.clone(),
        config.done_playlist_id.clone(),
        config.download_path.clone(),
    ));

    if config.daemon {
        let shutdown = shutdown::install_signal_handler();
        manager
            .run_daemon(Duration::from_secs(config.poll_interval_secs), shutdown)
            .await?;
    } else {
        manager.run_once().await?;
    }

    Ok(())
}
