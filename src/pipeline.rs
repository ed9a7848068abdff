// src/pipeline.rs
//! # Daily pipeline
//! Source → importance filter → commentary (sequential) → delivery.
//! Every stage recovers from its own failures, so `run` always completes.

use chrono::NaiveDate;
use metrics::gauge;
use serde::Serialize;
use std::sync::Arc;

use crate::analyze::ai_adapter::{build_generator, DynGenerator, Generator};
use crate::analyze::commentary::enrich_all;
use crate::config::BotConfig;
use crate::ingest::config::build_source;
use crate::ingest::{self, types::CalendarSource, types::Importance};
use crate::notify::{build_notifier, deliver, DeliveryMode, Notifier};

/// Counts from one run; logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub date: NaiveDate,
    pub kept: usize,
    pub fallbacks: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
}

pub struct Pipeline {
    source: Box<dyn CalendarSource>,
    generator: DynGenerator,
    notifier: Arc<dyn Notifier>,
    mode: DeliveryMode,
    threshold: Importance,
    language: String,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn CalendarSource>,
        generator: DynGenerator,
        notifier: Arc<dyn Notifier>,
        mode: DeliveryMode,
        language: impl Into<String>,
    ) -> Self {
        Self {
            source,
            generator,
            notifier,
            mode,
            threshold: Importance::Medium,
            language: language.into(),
        }
    }

    /// Wire the live source, generator and channel described by `cfg`.
    pub fn from_config(cfg: &BotConfig) -> anyhow::Result<Self> {
        let notifier = build_notifier(cfg)?;
        Ok(Self::new(
            build_source(&cfg.source),
            build_generator(&cfg.ai, cfg.dry_run),
            notifier,
            cfg.delivery_mode,
            cfg.language.clone(),
        ))
    }

    pub fn with_threshold(mut self, threshold: Importance) -> Self {
        self.threshold = threshold;
        self
    }

    pub async fn run(&self, date: NaiveDate) -> RunReport {
        let events = ingest::fetch_significant(self.source.as_ref(), date, self.threshold).await;
        let kept = events.len();
        tracing::info!(%date, provider = self.source.name(), kept, "significant events selected");

        let generator: &dyn Generator = self.generator.as_ref();
        let results = enrich_all(events, generator, &self.language).await;
        let fallbacks = results.iter().filter(|r| !r.generated).count();

        let outcome = deliver(&results, self.notifier.as_ref(), self.mode).await;

        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        let report = RunReport {
            date,
            kept,
            fallbacks,
            messages_sent: outcome.sent,
            messages_failed: outcome.failed,
        };
        tracing::info!(
            %date,
            kept = report.kept,
            fallbacks = report.fallbacks,
            sent = report.messages_sent,
            failed = report.messages_failed,
            "pipeline run finished"
        );
        report
    }
}
