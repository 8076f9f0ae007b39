//! Bot configuration from the environment

use chrono::Duration;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_WATERMARK_COMMAND: &str = "magick";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Public URL registered with `setWebhook` at startup
    pub webhook_url: Option<String>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header
    pub webhook_secret: Option<String>,
    pub port: u16,
    pub db_path: PathBuf,
    /// Idle sessions older than this are discarded; unbounded when unset
    pub session_ttl: Option<Duration>,
    /// Link buttons per keyboard row; one row when unset
    pub link_row_width: Option<NonZeroUsize>,
    pub watermark_command: String,
    pub api_base: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bot_token = var("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let port = match var("PORT") {
            Some(value) => parse("PORT", value)?,
            None => DEFAULT_PORT,
        };

        let db_path = var("CAPTION_EDITOR_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.caption-editor/sessions.db"))
            },
            PathBuf::from,
        );

        let session_ttl = var("SESSION_TTL_SECS")
            .map(|value| {
                let secs: i64 = parse("SESSION_TTL_SECS", value.clone())?;
                Duration::try_seconds(secs)
                    .filter(|_| secs > 0)
                    .ok_or(ConfigError::Invalid {
                        name: "SESSION_TTL_SECS",
                        value,
                    })
            })
            .transpose()?;

        let link_row_width = var("LINK_ROW_WIDTH")
            .map(|value| parse::<NonZeroUsize>("LINK_ROW_WIDTH", value))
            .transpose()?;

        Ok(Self {
            bot_token,
            webhook_url: var("WEBHOOK_URL"),
            webhook_secret: var("WEBHOOK_SECRET"),
            port,
            db_path,
            session_ttl,
            link_row_width,
            watermark_command: var("WATERMARK_COMMAND")
                .unwrap_or_else(|| DEFAULT_WATERMARK_COMMAND.to_string()),
            api_base: var("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
