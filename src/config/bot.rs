// src/config/bot.rs
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ai::AiConfig;
use crate::errors::ConfigError;
use crate::ingest::config::{SourceConfig, SourceKind};
use crate::notify::DeliveryMode;

pub const ENV_BOT_CONFIG_PATH: &str = "BOT_CONFIG_PATH";
pub const DEFAULT_BOT_CONFIG_PATH: &str = "config/bot.toml";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_POLL_SECS: u64 = 30;
pub const DEFAULT_LANGUAGE: &str = "English";

/// Non-secret settings that may live in a TOML file. Environment wins.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FileSettings {
    pub source: Option<String>,
    pub delivery_mode: Option<String>,
    pub trigger_time: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub language: Option<String>,
}

impl FileSettings {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// 1) $BOT_CONFIG_PATH (must exist)
    /// 2) config/bot.toml
    /// 3) empty
    pub fn load_default<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = lookup(ENV_BOT_CONFIG_PATH) {
            return Self::load_from(&PathBuf::from(p));
        }
        let fallback = PathBuf::from(DEFAULT_BOT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

/// Process-wide configuration, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub source: SourceConfig,
    /// `None` only in dry-run mode.
    pub telegram: Option<TelegramConfig>,
    pub ai: AiConfig,
    pub delivery_mode: DeliveryMode,
    pub trigger_time: NaiveTime,
    pub poll_interval: Duration,
    pub port: u16,
    pub language: String,
    pub dry_run: bool,
}

impl BotConfig {
    /// Read process environment plus optional config files.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |k: &str| std::env::var(k).ok();
        let file = FileSettings::load_default(lookup)?;
        let ai = AiConfig::load_default(lookup)?;
        Self::from_parts(lookup, file, ai)
    }

    /// Assemble from an arbitrary key lookup. Collects every missing required key
    /// before failing so the operator sees them all at once.
    pub fn from_parts<F>(lookup: F, file: FileSettings, mut ai: AiConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut missing = Vec::new();

        let dry_run = get("DRY_RUN").is_some_and(|v| is_truthy(&v));

        let kind = match get("CALENDAR_SOURCE").or(file.source.clone()) {
            Some(v) => v.parse::<SourceKind>().map_err(|message| ConfigError::Invalid {
                key: "CALENDAR_SOURCE".into(),
                message,
            })?,
            None => SourceKind::Api,
        };
        let api_key = get("API_KEY_JBLANKED");
        if kind == SourceKind::Api && api_key.is_none() {
            missing.push("API_KEY_JBLANKED".to_string());
        }

        let token = get("TELEGRAM_TOKEN");
        let chat_id = get("TELEGRAM_CHAT_ID").or_else(|| get("CHANNEL_ID"));
        let telegram = match (token, chat_id) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig { token, chat_id }),
            (token, chat_id) => {
                if !dry_run {
                    if token.is_none() {
                        missing.push("TELEGRAM_TOKEN".to_string());
                    }
                    if chat_id.is_none() {
                        missing.push("TELEGRAM_CHAT_ID".to_string());
                    }
                }
                None
            }
        };

        ai.resolve_api_key(|k| get(k));
        if !dry_run && ai.api_key.trim().is_empty() {
            missing.push("OPENAI_API_KEY".to_string());
        }

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let delivery_mode = match get("DELIVERY_MODE").or(file.delivery_mode.clone()) {
            Some(v) => v.parse::<DeliveryMode>().map_err(|message| ConfigError::Invalid {
                key: "DELIVERY_MODE".into(),
                message,
            })?,
            None => kind.default_delivery_mode(),
        };

        let trigger_time = match get("TRIGGER_TIME").or(file.trigger_time.clone()) {
            Some(v) => parse_trigger_time(&v)?,
            None => NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
        };

        let poll_secs = match get("POLL_INTERVAL_SECS") {
            Some(v) => parse_number::<u64>("POLL_INTERVAL_SECS", &v)?,
            None => file.poll_interval_secs.unwrap_or(DEFAULT_POLL_SECS),
        };
        if poll_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }

        let port = match get("PORT") {
            Some(v) => parse_number::<u16>("PORT", &v)?,
            None => DEFAULT_PORT,
        };

        let language = get("COMMENTARY_LANGUAGE")
            .or(file.language.clone())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(Self {
            source: SourceConfig { kind, api_key },
            telegram,
            ai,
            delivery_mode,
            trigger_time,
            poll_interval: Duration::from_secs(poll_secs),
            port,
            language,
            dry_run,
        })
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_number<T: std::str::FromStr>(key: &str, v: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    v.parse::<T>().map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("{v:?}: {e}"),
    })
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_trigger_time(v: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(v, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(v, "%H:%M:%S"))
        .map_err(|e| ConfigError::Invalid {
            key: "TRIGGER_TIME".into(),
            message: format!("{v:?}: {e}"),
        })
}
