// tests/pipeline_flow.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use econ_calendar_bot::analyze::MockGenerator;
use econ_calendar_bot::errors::FetchError;
use econ_calendar_bot::ingest::providers::jblanked_api::JblankedApiProvider;
use econ_calendar_bot::ingest::types::{CalendarSource, RawEvent};
use econ_calendar_bot::notify::{
    DeliveryMode, ParseMode, RecordingNotifier, BATCH_HEADER, NO_EVENTS_MESSAGE,
};
use econ_calendar_bot::{Importance, Pipeline, FALLBACK_TEXT};

const FIXTURE: &str = include_str!("fixtures/jblanked_today.json");

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

struct FailingSource;

#[async_trait]
impl CalendarSource for FailingSource {
    async fn fetch(&self, _date: NaiveDate) -> Result<Vec<RawEvent>, FetchError> {
        Err(FetchError::Http { status: 503 })
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

fn pipeline(
    source: Box<dyn CalendarSource>,
    generator: Arc<MockGenerator>,
    notifier: Arc<RecordingNotifier>,
    mode: DeliveryMode,
) -> Pipeline {
    Pipeline::new(source, generator, notifier, mode, "English")
}

#[tokio::test]
async fn per_event_run_sends_one_markdown_message_per_kept_event() {
    let generator = Arc::new(MockGenerator::fixed("Markets expect volatility."));
    let notifier = Arc::new(RecordingNotifier::new());
    let p = pipeline(
        Box::new(JblankedApiProvider::from_fixture(FIXTURE)),
        generator.clone(),
        notifier.clone(),
        DeliveryMode::PerEvent,
    );

    let report = p.run(day()).await;

    assert_eq!(report.kept, 2);
    assert_eq!(report.fallbacks, 0);
    assert_eq!(report.messages_sent, 2);
    assert_eq!(report.messages_failed, 0);
    assert_eq!(generator.calls(), 2);

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].0,
        "*CPI* (USD) - *High*\n\nMarkets expect volatility."
    );
    assert!(sent[1].0.starts_with("*Rate Decision* (JPY) - *Medium*"));
    assert!(sent.iter().all(|(_, mode)| *mode == ParseMode::Markdown));

    // Low and unmapped events never reach the generator.
    let prompts = generator.prompts().join("\n");
    assert!(!prompts.contains("Minor Index"));
    assert!(!prompts.contains("Bank Holiday"));
}

#[tokio::test]
async fn batched_run_sends_a_single_digest() {
    let generator = Arc::new(MockGenerator::fixed("Short take."));
    let notifier = Arc::new(RecordingNotifier::new());
    let p = pipeline(
        Box::new(JblankedApiProvider::from_fixture(FIXTURE)),
        generator,
        notifier.clone(),
        DeliveryMode::Batched,
    );

    let report = p.run(day()).await;
    assert_eq!(report.messages_sent, 1);

    let msgs = notifier.messages();
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].starts_with(BATCH_HEADER));
    assert!(msgs[0].contains("CPI (USD) - High\nShort take."));
    assert!(msgs[0].contains("\n\n---\n\nRate Decision (JPY) - Medium"));
}

#[tokio::test]
async fn empty_day_sends_notice_without_generation() {
    let generator = Arc::new(MockGenerator::fixed("unused"));
    let notifier = Arc::new(RecordingNotifier::new());
    let p = pipeline(
        Box::new(JblankedApiProvider::from_fixture("[]")),
        generator.clone(),
        notifier.clone(),
        DeliveryMode::PerEvent,
    );

    let report = p.run(day()).await;

    assert_eq!(report.kept, 0);
    assert_eq!(generator.calls(), 0);
    assert_eq!(notifier.messages(), vec![NO_EVENTS_MESSAGE.to_string()]);
}

#[tokio::test]
async fn failing_source_is_reported_as_an_empty_day() {
    let generator = Arc::new(MockGenerator::fixed("unused"));
    let notifier = Arc::new(RecordingNotifier::new());
    let p = pipeline(
        Box::new(FailingSource),
        generator.clone(),
        notifier.clone(),
        DeliveryMode::Batched,
    );

    let report = p.run(day()).await;

    assert_eq!(report.kept, 0);
    assert_eq!(report.messages_sent, 1);
    assert_eq!(generator.calls(), 0);
    assert_eq!(notifier.messages(), vec![NO_EVENTS_MESSAGE.to_string()]);
}

#[tokio::test]
async fn one_generation_failure_falls_back_for_that_event_only() {
    let generator = Arc::new(MockGenerator::fixed("Fine.").failing_on("Rate Decision"));
    let notifier = Arc::new(RecordingNotifier::new());
    let p = pipeline(
        Box::new(JblankedApiProvider::from_fixture(FIXTURE)),
        generator.clone(),
        notifier.clone(),
        DeliveryMode::PerEvent,
    );

    let report = p.run(day()).await;

    assert_eq!(report.fallbacks, 1);
    assert_eq!(report.messages_sent, 2);
    let msgs = notifier.messages();
    assert!(msgs[0].ends_with("Fine."));
    assert!(msgs[1].ends_with(FALLBACK_TEXT));
}

#[tokio::test]
async fn per_event_delivery_continues_after_a_rejected_message() {
    let generator = Arc::new(MockGenerator::fixed("ok"));
    let notifier = Arc::new(RecordingNotifier::new().failing_on("*CPI*"));
    let p = pipeline(
        Box::new(JblankedApiProvider::from_fixture(FIXTURE)),
        generator,
        notifier.clone(),
        DeliveryMode::PerEvent,
    );

    let report = p.run(day()).await;

    assert_eq!(report.messages_failed, 1);
    assert_eq!(report.messages_sent, 1);
    assert!(notifier.messages()[0].contains("Rate Decision"));
}

#[tokio::test]
async fn raising_the_threshold_keeps_only_high_impact() {
    let generator = Arc::new(MockGenerator::fixed("x"));
    let notifier = Arc::new(RecordingNotifier::new());
    let p = pipeline(
        Box::new(JblankedApiProvider::from_fixture(FIXTURE)),
        generator,
        notifier.clone(),
        DeliveryMode::PerEvent,
    )
    .with_threshold(Importance::High);

    let report = p.run(day()).await;

    assert_eq!(report.kept, 1);
    assert!(notifier.messages()[0].starts_with("*CPI*"));
}
