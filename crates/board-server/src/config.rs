use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::warn;

use board_api::Settings;

/// Placeholder secrets that should never reach a public deployment.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "my-secret-token", "change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub settings: Settings,
    pub report_webhook_url: String,
    pub report_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port: u16 = var("BOARD_PORT", "8080")
            .parse()
            .context("BOARD_PORT must be a port number")?;
        let session_days: i64 = var("BOARD_SESSION_DAYS", "30")
            .parse()
            .context("BOARD_SESSION_DAYS must be a whole number of days")?;
        if session_days <= 0 {
            bail!("BOARD_SESSION_DAYS must be at least 1, got {}", session_days);
        }
        let timeout_secs: u64 = var("BOARD_REPORT_TIMEOUT_SECS", "30")
            .parse()
            .context("BOARD_REPORT_TIMEOUT_SECS must be a whole number of seconds")?;

        let bot_password = var("BOARD_BOT_PASSWORD", "bot-password");
        if bot_password.is_empty() {
            bail!("BOARD_BOT_PASSWORD must not be empty; bot accounts could not be created");
        }

        let settings = Settings {
            session_secret: var("BOARD_SESSION_SECRET", "dev-secret-change-me"),
            session_ttl: chrono::Duration::days(session_days),
            api_token: var("BOARD_API_TOKEN", "my-secret-token"),
            bot_password,
        };

        Ok(Self {
            host: var("BOARD_HOST", "0.0.0.0"),
            port,
            db_path: var("BOARD_DB_PATH", "data.db").into(),
            settings,
            report_webhook_url: var(
                "BOARD_REPORT_WEBHOOK_URL",
                "http://localhost:5678/webhook/report",
            ),
            report_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn warn_on_placeholders(&self) {
        if PLACEHOLDER_SECRETS.contains(&self.settings.session_secret.as_str()) {
            warn!("BOARD_SESSION_SECRET is a placeholder; sessions can be forged");
        }
        if PLACEHOLDER_SECRETS.contains(&self.settings.api_token.as_str()) {
            warn!("BOARD_API_TOKEN is a placeholder; anyone can post as a bot");
        }
    }
}
