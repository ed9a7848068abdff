// src/ingest/config.rs
use std::str::FromStr;

use crate::ingest::providers::{forexfactory::ForexFactoryProvider, jblanked_api::JblankedApiProvider};
use crate::ingest::types::CalendarSource;
use crate::notify::DeliveryMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Paid structured JSON API.
    Api,
    /// Scraped public HTML calendar.
    ForexFactory,
}

impl SourceKind {
    /// The API variant posts one message per event; the scraper variant posts a digest.
    pub fn default_delivery_mode(self) -> DeliveryMode {
        match self {
            SourceKind::Api => DeliveryMode::PerEvent,
            SourceKind::ForexFactory => DeliveryMode::Batched,
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" | "jblanked" => Ok(SourceKind::Api),
            "forexfactory" | "html" => Ok(SourceKind::ForexFactory),
            other => Err(format!(
                "unknown calendar source {other:?} (expected \"api\" or \"forexfactory\")"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Required for `SourceKind::Api`.
    pub api_key: Option<String>,
}

/// Build the live HTTP-backed source for this configuration.
pub fn build_source(cfg: &SourceConfig) -> Box<dyn CalendarSource> {
    match cfg.kind {
        SourceKind::Api => Box::new(JblankedApiProvider::new(
            cfg.api_key.clone().unwrap_or_default(),
        )),
        SourceKind::ForexFactory => Box::new(ForexFactoryProvider::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_kind_aliases() {
        assert_eq!("API".parse::<SourceKind>().unwrap(), SourceKind::Api);
        assert_eq!(" jblanked ".parse::<SourceKind>().unwrap(), SourceKind::Api);
        assert_eq!(
            "forexfactory".parse::<SourceKind>().unwrap(),
            SourceKind::ForexFactory
        );
        assert!("bloomberg".parse::<SourceKind>().is_err());
    }

    #[test]
    fn builds_named_sources() {
        let api = build_source(&SourceConfig {
            kind: SourceKind::Api,
            api_key: Some("k".into()),
        });
        assert_eq!(api.name(), "jblanked");
        let html = build_source(&SourceConfig {
            kind: SourceKind::ForexFactory,
            api_key: None,
        });
        assert_eq!(html.name(), "forexfactory");
    }
}
