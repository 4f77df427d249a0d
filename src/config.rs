use std::path::PathBuf;

use crate::types::{DownloadMode, LogLevel};

/// Application configuration, validated from CLI/environment input.
///
/// Validation happens before any remote interaction; a failure here is the
/// only path that exits the process with a configuration error.
#[derive(Debug)]
pub struct Config {
    pub client_secret_json: Option<String>,
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub todo_playlist_id: String,
    pub done_playlist_id: String,
    pub download_path: PathBuf,
    pub ytdlp_path: String,
    pub poll_interval_secs: u64,
    pub daily_quota_limit: u32,
    pub metrics_port: u16,
    pub download_mode: DownloadMode,
    pub log_level: LogLevel,
    pub daemon: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Validate CLI input into a runnable configuration.
    ///
    /// All problems are collected so the operator sees the full list in one
    /// run instead of fixing them one restart at a time.
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let mut errors: Vec<String> = Vec::new();

        let credentials_file = expand_tilde(&cli.credentials_file);

        match &cli.client_secret_json {
            Some(raw) => {
                if let Err(e) = serde_json::from_str::<serde_json::Value>(raw) {
                    errors.push(format!("CLIENT_SECRET_JSON is not valid JSON: {}", e));
                }
            }
            None => {
                if !credentials_file.exists() {
                    errors.push(format!(
                        "no client credentials found (neither CLIENT_SECRET_JSON nor {})",
                        credentials_file.display()
                    ));
                }
            }
        }

        if cli.todo_playlist_id.as_deref().unwrap_or("").is_empty() {
            errors.push("TODO_PLAYLIST_ID not set".to_string());
        }
        if cli.done_playlist_id.as_deref().unwrap_or("").is_empty() {
            errors.push("DONE_PLAYLIST_ID not set".to_string());
        }

        if !errors.is_empty() {
            anyhow::bail!("configuration errors:\n  - {}", errors.join("\n  - "));
        }

        Ok(Self {
            client_secret_json: cli.client_secret_json,
            credentials_file,
            token_file: expand_tilde(&cli.token_file),
            todo_playlist_id: cli.todo_playlist_id.unwrap_or_default(),
            done_playlist_id: cli.done_playlist_id.unwrap_or_default(),
            download_path: expand_tilde(&cli.download_path),
            ytdlp_path: cli.ytdlp_path,
            poll_interval_secs: cli.poll_interval,
            daily_quota_limit: cli.daily_quota_limit,
            metrics_port: cli.metrics_port,
            download_mode: cli.download_mode,
            log_level: cli.log_level,
            daemon: cli.daemon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> crate::cli::Cli {
        let mut full = vec!["yt-playlist-manager"];
        full.extend_from_slice(args);
        crate::cli::Cli::try_parse_from(full).unwrap()
    }

    fn with_ids(extra: &[&str]) -> crate::cli::Cli {
        let mut args = vec![
            "--todo-playlist-id",
            "PLtodo",
            "--done-playlist-id",
            "PLdone",
        ];
        args.extend_from_slice(extra);
        parse(&args)
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(
            expand_tilde("/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(expand_tilde("relative/path"), PathBuf::from("relative/path"));
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/downloads");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("downloads"));
        }
    }

    #[test]
    fn test_missing_playlist_ids_rejected() {
        let cli = parse(&["--client-secret-json", "{}"]);
        let err = Config::from_cli(cli).unwrap_err().to_string();
        assert!(err.contains("TODO_PLAYLIST_ID not set"));
        assert!(err.contains("DONE_PLAYLIST_ID not set"));
    }

    #[test]
    fn test_invalid_inline_secret_rejected() {
        let cli = with_ids(&["--client-secret-json", "{not json"]);
        let err = Config::from_cli(cli).unwrap_err().to_string();
        assert!(err.contains("not valid JSON"));
    }

    #[test]
    fn test_missing_credentials_file_rejected() {
        let cli = with_ids(&["--credentials-file", "/nonexistent/secret.json"]);
        let err = Config::from_cli(cli).unwrap_err().to_string();
        assert!(err.contains("no client credentials found"));
    }

    #[test]
    fn test_valid_config_with_inline_secret() {
        let cli = with_ids(&["--client-secret-json", "{\"installed\":{}}"]);
        let cfg = Config::from_cli(cli).unwrap();
        assert_eq!(cfg.todo_playlist_id, "PLtodo");
        assert_eq!(cfg.done_playlist_id, "PLdone");
        assert_eq!(cfg.poll_interval_secs, 5);
        assert_eq!(cfg.daily_quota_limit, 10_000);
        assert_eq!(cfg.download_mode, DownloadMode::Video);
        assert!(!cfg.daemon);
    }

    #[test]
    fn test_overrides_pass_through() {
        let cli = with_ids(&[
            "--client-secret-json",
            "{}",
            "--daemon",
            "--poll-interval",
            "60",
            "--download-mode",
            "audio",
            "--download-path",
            "/tmp/media",
        ]);
        let cfg = Config::from_cli(cli).unwrap();
        assert!(cfg.daemon);
        assert_eq!(cfg.poll_interval_secs, 60);
        assert_eq!(cfg.download_mode, DownloadMode::Audio);
        assert_eq!(cfg.download_path, PathBuf::from("/tmp/media"));
    }
}
