// src/ingest/providers/jblanked_api.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::histogram;
use serde_json::Value;

use crate::errors::FetchError;
use crate::ingest::types::{CalendarSource, RawEvent};

pub const DEFAULT_URL: &str = "https://www.jblanked.com/news/api/mql5/calendar/today/";

/// Structured calendar API. Body is a JSON array of objects carrying
/// `Name`, `Currency` and `strength`; other fields are ignored.
pub struct JblankedApiProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        api_key: String,
        client: reqwest::Client,
    },
}

impl JblankedApiProvider {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn new(api_key: String) -> Self {
        Self::with_url(DEFAULT_URL.to_string(), api_key)
    }

    pub fn with_url(url: String, api_key: String) -> Self {
        Self {
            mode: Mode::Http {
                url,
                api_key,
                client: super::http_client(),
            },
        }
    }

    pub fn parse_body(body: &str) -> Result<Vec<RawEvent>, FetchError> {
        let t0 = std::time::Instant::now();
        let items: Vec<Value> = serde_json::from_str(body).map_err(|e| FetchError::Parse {
            message: format!("expected JSON array of events: {e}"),
        })?;

        // Field-by-field so one odd record (e.g. numeric `strength`) only loses its own
        // impact instead of failing the whole payload.
        let out = items
            .iter()
            .map(|it| RawEvent {
                title: string_field(it, "Name"),
                currency: string_field(it, "Currency"),
                impact: string_field(it, "strength"),
            })
            .collect::<Vec<_>>();

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

fn string_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl CalendarSource for JblankedApiProvider {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawEvent>, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_body(s),
            Mode::Http {
                url,
                api_key,
                client,
            } => {
                // The endpoint always answers for the server's "today".
                tracing::debug!(provider = "jblanked", %date, url = %url, "fetching calendar");
                let resp = client
                    .get(url)
                    .header("Authorization", format!("Api-Key {api_key}"))
                    .header("Content-Type", "application/json")
                    .send()
                    .await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Http {
                        status: status.as_u16(),
                    });
                }
                let body = resp.text().await?;
                Self::parse_body(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "jblanked"
    }
}
