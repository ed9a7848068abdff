// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use crate::ingest::types::{CalendarSource, Importance, NormalizedEvent, RawEvent};
use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Raw events parsed from the source.");
        describe_counter!(
            "ingest_kept_total",
            "Events kept after normalization + importance filter."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Events dropped (unmapped impact, empty title or below threshold)."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Source fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Source parse time in milliseconds.");
    });
}

pub const MAX_TEXT_CHARS: usize = 300;

/// Normalize scraped/API text: decode entities, strip tags, collapse whitespace,
/// cap at `MAX_TEXT_CHARS`.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. nbsp)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

/// Map one raw record to the uniform shape, or `None` when the impact label
/// does not map or the title is empty.
pub fn normalize_event(raw: &RawEvent) -> Option<NormalizedEvent> {
    let importance = raw.impact.as_deref().and_then(Importance::from_label)?;
    let title = normalize_text(raw.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let currency = raw
        .currency
        .as_deref()
        .map(normalize_text)
        .filter(|c| !c.is_empty());
    Some(NormalizedEvent {
        title,
        currency,
        importance,
    })
}

/// Pure and idempotent: same payload in, same sequence out.
pub fn normalize_events(raw: &[RawEvent]) -> Vec<NormalizedEvent> {
    raw.iter().filter_map(normalize_event).collect()
}

/// Keep events at or above `threshold`, preserving input order.
pub fn filter_by_importance(
    events: Vec<NormalizedEvent>,
    threshold: Importance,
) -> Vec<NormalizedEvent> {
    events
        .into_iter()
        .filter(|e| e.importance >= threshold)
        .collect()
}

/// Fetch + normalize for `date`. A failing source yields an empty day; the
/// error is logged and counted, never propagated.
pub async fn fetch_today(source: &dyn CalendarSource, date: NaiveDate) -> Vec<NormalizedEvent> {
    ensure_metrics_described();

    let raw = match source.fetch(date).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, provider = source.name(), "calendar fetch failed; treating day as empty");
            counter!("ingest_provider_errors_total").increment(1);
            return Vec::new();
        }
    };

    counter!("ingest_events_total").increment(raw.len() as u64);
    let normalized = normalize_events(&raw);
    let dropped = raw.len() - normalized.len();
    if dropped > 0 {
        counter!("ingest_filtered_total").increment(dropped as u64);
    }

    tracing::debug!(
        provider = source.name(),
        raw = raw.len(),
        normalized = normalized.len(),
        "calendar fetched"
    );
    normalized
}

/// Fetch, normalize and apply the importance threshold in one step.
pub async fn fetch_significant(
    source: &dyn CalendarSource,
    date: NaiveDate,
    threshold: Importance,
) -> Vec<NormalizedEvent> {
    let all = fetch_today(source, date).await;
    let total = all.len();
    let kept = filter_by_importance(all, threshold);

    counter!("ingest_kept_total").increment(kept.len() as u64);
    counter!("ingest_filtered_total").increment((total - kept.len()) as u64);
    kept
}
