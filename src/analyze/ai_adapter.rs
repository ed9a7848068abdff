//! AI adapter: generation provider abstraction for event commentary.
//! One request per call, no cache, no retry.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;
use crate::errors::GenerationError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;

/// Text generation collaborator used by the commentary enricher.
pub trait Generator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynGenerator = Arc<dyn Generator>;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const SYSTEM_PROMPT: &str = "You are a helpful financial assistant.";

/// OpenAI generator, or a fixed mock for dry runs that have no API key.
pub fn build_generator(config: &AiConfig, dry_run: bool) -> DynGenerator {
    if dry_run && config.api_key.trim().is_empty() {
        return Arc::new(MockGenerator::fixed("(dry run) commentary would appear here."));
    }
    Arc::new(OpenAiGenerator::new(config))
}

// ------------------------------------------------------------
// OpenAI
// ------------------------------------------------------------

/// OpenAI Chat Completions. `max_tokens` and `temperature` are fixed at construction.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(config: &AiConfig) -> Self {
        Self::with_url(config, OPENAI_CHAT_URL)
    }

    pub fn with_url(config: &AiConfig, url: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("econ-calendar-bot/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

/// Pull the first choice's content out of a Chat Completions body.
pub fn extract_content(body: &str) -> Result<String, GenerationError> {
    let resp: Resp = serde_json::from_str(body).map_err(|e| GenerationError::Malformed {
        message: e.to_string(),
    })?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    let cleaned = clean_commentary(&content);
    if cleaned.is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(cleaned)
    }
}

impl Generator for OpenAiGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return Err(GenerationError::Disabled);
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: SYSTEM_PROMPT,
                    },
                    Msg {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let resp = self
                .http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(GenerationError::Http {
                    status: status.as_u16(),
                });
            }
            let body = resp.text().await?;
            extract_content(&body)
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Mock
// ------------------------------------------------------------

/// Deterministic generator for tests and dry runs. Prompts containing any of
/// the `fail_on` markers fail with `GenerationError::EmptyResponse`.
pub struct MockGenerator {
    text: String,
    fail_on: Vec<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn fixed(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail_on: Vec::new(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on.push(marker.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl Generator for MockGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerationFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut g) = self.prompts.lock() {
            g.push(prompt.to_string());
        }
        let fail = self.fail_on.iter().any(|m| prompt.contains(m.as_str()));
        let out = self.text.clone();
        Box::pin(async move {
            if fail {
                Err(GenerationError::EmptyResponse)
            } else {
                Ok(out)
            }
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Sanitization
// ------------------------------------------------------------

/// Trim, unify line endings, and squeeze runs of blank lines to one.
pub fn clean_commentary(input: &str) -> String {
    let unified = input.replace("\r\n", "\n");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.trim().lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}
