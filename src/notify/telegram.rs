use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Notifier, ParseMode};
use crate::errors::DeliveryError;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot API `sendMessage` sender for a single chat/channel.
#[derive(Clone)]
pub struct TelegramNotifier {
    api_base: String,
    token: String,
    chat_id: String,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            token,
            chat_id,
            client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Point at a different Bot API host (self-hosted server, tests).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Map a Bot API reply to a delivery result. Telegram signals most
/// rejections with `ok: false` plus a description.
pub(crate) fn interpret_reply(status: u16, body: &str) -> Result<(), DeliveryError> {
    match serde_json::from_str::<ApiReply>(body) {
        Ok(reply) if reply.ok && (200..300).contains(&status) => Ok(()),
        Ok(reply) if !reply.ok => Err(DeliveryError::Rejected {
            description: reply
                .description
                .unwrap_or_else(|| format!("HTTP {status}")),
        }),
        _ => Err(DeliveryError::Http { status }),
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str, parse_mode: ParseMode) -> Result<(), DeliveryError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: match parse_mode {
                ParseMode::Plain => None,
                ParseMode::Markdown => Some("Markdown"),
            },
        };

        let rsp = self.client.post(self.endpoint()).json(&payload).send().await?;
        let status = rsp.status().as_u16();
        let body = rsp.text().await?;
        interpret_reply(status, &body)
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
