use crate::types::*;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "yt-playlist-manager",
    about = "Download videos from a todo YouTube playlist and move them to a done playlist"
)]
pub struct Cli {
    /// Run continuously, polling the todo playlist
    #[arg(long)]
    pub daemon: bool,

    /// OAuth client secret as an inline JSON string.
    /// WARNING: visible in process listings when passed as a flag.
    /// Prefer the CLIENT_SECRET_JSON environment variable.
    #[arg(long, env = "CLIENT_SECRET_JSON")]
    pub client_secret_json: Option<String>,

    /// Path to the OAuth client secret JSON file (used when no inline JSON is set)
    #[arg(long, env = "CREDENTIALS_FILE", default_value = "client_secret.json")]
    pub credentials_file: String,

    /// Path where the OAuth token is persisted between runs
    #[arg(long, env = "TOKEN_FILE", default_value = "token.json")]
    pub token_file: String,

    /// Playlist holding videos waiting to be downloaded
    #[arg(long, env = "TODO_PLAYLIST_ID")]
    pub todo_playlist_id: Option<String>,

    /// Playlist that receives videos after a successful download
    #[arg(long, env = "DONE_PLAYLIST_ID")]
    pub done_playlist_id: Option<String>,

    /// Local directory for downloaded media
    #[arg(long, env = "DOWNLOAD_PATH", default_value = "./downloads")]
    pub download_path: String,

    /// Seconds between processing cycles in daemon mode
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 5)]
    pub poll_interval: u64,

    /// Download full video or audio-only
    #[arg(long, env = "DOWNLOAD_MODE", value_enum, default_value = "video")]
    pub download_mode: DownloadMode,

    /// Daily YouTube API quota budget in units
    #[arg(long, env = "DAILY_QUOTA_LIMIT", default_value_t = 10_000)]
    pub daily_quota_limit: u32,

    /// Port for the Prometheus metrics endpoint
    #[arg(long, env = "METRICS_PORT", default_value_t = 8080)]
    pub metrics_port: u16,

    /// Path to the yt-dlp binary (resolved via PATH when not absolute)
    #[arg(long, env = "YTDLP_PATH", default_value = "yt-dlp")]
    pub ytdlp_path: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
