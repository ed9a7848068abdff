// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::errors::ConfigError;

pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";
pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_max_tokens() -> u32 {
    300
}
fn default_temperature() -> f32 {
    0.7
}
fn default_api_key() -> String {
    "ENV".to_string()
}

/// Commentary generation settings. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key: default_api_key(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let cfg: AiConfig = serde_json::from_str(&data).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(cfg.sanitized())
    }

    /// `$AI_CONFIG_PATH` (must exist when set), then `config/ai.json`, then defaults.
    pub fn load_default<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = lookup(ENV_AI_CONFIG_PATH) {
            return Self::load_from_file(p);
        }
        let fallback = Path::new(DEFAULT_AI_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(fallback);
        }
        Ok(Self::default())
    }

    /// Resolve an "ENV" key against `OPENAI_API_KEY`. Empty when neither is set.
    pub fn resolve_api_key<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = lookup("OPENAI_API_KEY").unwrap_or_default();
        }
    }

    fn sanitized(mut self) -> Self {
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        self
    }
}
