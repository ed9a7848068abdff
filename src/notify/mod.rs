// src/notify/mod.rs
//! Delivery: message rendering and channel senders.

pub mod telegram;

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::Result as AnyResult;
use metrics::counter;

use crate::analyze::commentary::CommentaryResult;
use crate::errors::DeliveryError;

pub use telegram::TelegramNotifier;

pub const NO_EVENTS_MESSAGE: &str = "No significant economic events today.";
pub const BATCH_HEADER: &str = "Economic calendar (medium and high impact) for today:";
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";
/// Telegram rejects messages longer than this (in characters).
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// One Markdown message per event; a failed send does not stop the rest.
    PerEvent,
    /// One plain-text digest; a failed send ends the attempt.
    Batched,
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_event" | "each" => Ok(DeliveryMode::PerEvent),
            "batched" | "batch" | "digest" => Ok(DeliveryMode::Batched),
            other => Err(format!(
                "unknown delivery mode {other:?} (expected \"per_event\" or \"batched\")"
            )),
        }
    }
}

/// Text formatting the channel should apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Plain,
    Markdown,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str, parse_mode: ParseMode) -> Result<(), DeliveryError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub sent: usize,
    pub failed: usize,
}

fn escape_markdown_char(ch: char) -> String {
    if matches!(ch, '_' | '*' | '`' | '[') {
        format!("\\{ch}")
    } else {
        ch.to_string()
    }
}

/// Escape the characters legacy Telegram Markdown treats as entity markers.
/// Only valid outside entities.
pub fn escape_markdown(s: &str) -> String {
    s.chars().map(escape_markdown_char).collect()
}

/// Bold `s` for legacy Markdown. Escapes are not allowed inside an entity, so
/// a literal `*` closes the bold run, is escaped, and the run reopens after it.
pub fn bold_markdown(s: &str) -> String {
    s.split('*')
        .map(|part| {
            if part.is_empty() {
                String::new()
            } else {
                format!("*{part}*")
            }
        })
        .collect::<Vec<_>>()
        .join("\\*")
}

/// `*CPI m/m* (USD) - *High*` followed by the commentary, split into parts of
/// at most `limit` chars. The header leads the first part; escape pairs are
/// never split.
pub fn render_event(r: &CommentaryResult, limit: usize) -> Vec<String> {
    let ev = &r.event;
    let currency = ev
        .currency
        .as_deref()
        .map(|c| format!(" ({})", escape_markdown(c)))
        .unwrap_or_default();
    let header = format!(
        "{}{} - *{}*\n\n",
        bold_markdown(&ev.title),
        currency,
        ev.importance
    );
    fill_chunks(header, r.text.chars().map(escape_markdown_char), limit)
}

fn render_section(r: &CommentaryResult) -> String {
    let ev = &r.event;
    let currency = ev
        .currency
        .as_deref()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default();
    format!("{}{} - {}\n{}", ev.title, currency, ev.importance, r.text)
}

/// Digest of all sections, split into as few messages as fit `limit` chars.
/// Splits happen on section boundaries; an oversized section is hard-split.
pub fn render_batch(results: &[CommentaryResult], limit: usize) -> Vec<String> {
    let sections: Vec<String> = results.iter().map(render_section).collect();
    pack_sections(&format!("{BATCH_HEADER}\n\n"), &sections, SECTION_SEPARATOR, limit)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Append indivisible `units` after `prefix`, starting a new chunk whenever
/// the next unit would overflow `limit`.
fn fill_chunks<I>(prefix: String, units: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let limit = limit.max(2);
    let mut out = Vec::new();
    let mut len = char_len(&prefix);
    let mut current = prefix;
    for unit in units {
        let unit_len = char_len(&unit);
        if len > 0 && len + unit_len > limit {
            out.push(std::mem::take(&mut current));
            len = 0;
        }
        current.push_str(&unit);
        len += unit_len;
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn pack_sections(header: &str, sections: &[String], sep: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(2);
    let mut out = Vec::new();
    let mut current = header.to_string();
    let mut current_has_section = false;

    for section in sections {
        let joiner = if current_has_section { sep } else { "" };
        if char_len(&current) + char_len(joiner) + char_len(section) <= limit {
            current.push_str(joiner);
            current.push_str(section);
            current_has_section = true;
            continue;
        }

        if current_has_section {
            out.push(std::mem::take(&mut current));
            current_has_section = false;
            if char_len(section) <= limit {
                current = section.clone();
                current_has_section = true;
                continue;
            }
        }

        // Oversized section: hard-split it, keeping any pending header in front.
        let units = section.chars().map(String::from);
        out.extend(fill_chunks(std::mem::take(&mut current), units, limit));
    }

    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}

/// Render and send. Empty input sends exactly one "no events" message.
/// Delivery failures are logged and counted, never returned.
pub async fn deliver(
    results: &[CommentaryResult],
    notifier: &dyn Notifier,
    mode: DeliveryMode,
) -> DeliveryOutcome {
    let mut outcome = DeliveryOutcome::default();

    if results.is_empty() {
        send_logged(notifier, NO_EVENTS_MESSAGE, ParseMode::Plain, &mut outcome).await;
        return outcome;
    }

    match mode {
        DeliveryMode::PerEvent => {
            for r in results {
                // Later parts of a rejected event are dropped; the next event still goes out.
                for part in render_event(r, MAX_MESSAGE_CHARS) {
                    if !send_logged(notifier, &part, ParseMode::Markdown, &mut outcome).await {
                        break;
                    }
                }
            }
        }
        DeliveryMode::Batched => {
            for msg in render_batch(results, MAX_MESSAGE_CHARS) {
                if !send_logged(notifier, &msg, ParseMode::Plain, &mut outcome).await {
                    break;
                }
            }
        }
    }
    outcome
}

async fn send_logged(
    notifier: &dyn Notifier,
    text: &str,
    parse_mode: ParseMode,
    outcome: &mut DeliveryOutcome,
) -> bool {
    match notifier.send(text, parse_mode).await {
        Ok(()) => {
            outcome.sent += 1;
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, channel = notifier.name(), "message delivery failed");
            counter!("delivery_failed_total").increment(1);
            outcome.failed += 1;
            false
        }
    }
}

/// Dry-run channel: messages only go to the log.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str, parse_mode: ParseMode) -> Result<(), DeliveryError> {
        tracing::info!(target: "delivery", ?parse_mode, "\n{text}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// --- Test helper ---
/// Captures every message; fails sends whose text contains one of `fail_on`.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, ParseMode)>>,
    fail_on: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on.push(marker.to_string());
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|g| g.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str, parse_mode: ParseMode) -> Result<(), DeliveryError> {
        if self.fail_on.iter().any(|m| text.contains(m.as_str())) {
            return Err(DeliveryError::Rejected {
                description: "scripted failure".into(),
            });
        }
        if let Ok(mut g) = self.sent.lock() {
            g.push((text.to_string(), parse_mode));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Build the channel for this process: Telegram, or the log in dry-run mode.
pub fn build_notifier(cfg: &crate::config::BotConfig) -> AnyResult<Arc<dyn Notifier>> {
    match (&cfg.telegram, cfg.dry_run) {
        (_, true) => Ok(Arc::new(LogNotifier)),
        (Some(tg), false) => Ok(Arc::new(TelegramNotifier::new(
            tg.token.clone(),
            tg.chat_id.clone(),
        ))),
        (None, false) => anyhow::bail!("telegram settings missing outside dry-run"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Importance, NormalizedEvent};

    fn result(title: &str, currency: Option<&str>, text: &str) -> CommentaryResult {
        CommentaryResult {
            event: NormalizedEvent {
                title: title.into(),
                currency: currency.map(str::to_string),
                importance: Importance::Medium,
            },
            text: text.into(),
            generated: true,
        }
    }

    #[test]
    fn event_header_format() {
        let msg = render_event(&result("CPI m/m", Some("USD"), "Inflation print."), MAX_MESSAGE_CHARS);
        assert_eq!(msg, vec!["*CPI m/m* (USD) - *Medium*\n\nInflation print."]);
        // No escapes inside the bold entity; commentary outside it is escaped.
        let no_cur = render_event(&result("OPEC_Meeting", None, "rate_hike"), MAX_MESSAGE_CHARS);
        assert_eq!(no_cur, vec!["*OPEC_Meeting* - *Medium*\n\nrate\\_hike"]);
    }

    #[test]
    fn asterisk_in_title_closes_and_reopens_bold() {
        assert_eq!(bold_markdown("A*B"), "*A*\\**B*");
        assert_eq!(bold_markdown("*A"), "\\**A*");
        assert_eq!(bold_markdown("A*"), "*A*\\*");

        let msg = render_event(&result("2*2=4", Some("USD"), "x"), MAX_MESSAGE_CHARS);
        assert_eq!(msg, vec!["*2*\\**2=4* (USD) - *Medium*\n\nx"]);
    }

    #[test]
    fn long_commentary_is_split_within_the_limit() {
        let text = "rate_hike ".repeat(500);
        let parts = render_event(&result("CPI", Some("USD"), &text), MAX_MESSAGE_CHARS);

        let header = "*CPI* (USD) - *Medium*\n\n";
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with(header));
        assert!(parts.iter().all(|p| p.chars().count() <= MAX_MESSAGE_CHARS));
        // Nothing lost, and no part ends on a dangling escape.
        assert_eq!(parts.concat(), format!("{header}{}", escape_markdown(&text)));
        assert!(parts.iter().all(|p| !p.ends_with('\\')));
    }

    #[tokio::test]
    async fn per_event_sends_every_part_of_a_long_message() {
        let n = RecordingNotifier::new();
        let results = vec![
            result("CPI", Some("USD"), &"x".repeat(5000)),
            result("GDP", None, "short"),
        ];
        let out = deliver(&results, &n, DeliveryMode::PerEvent).await;
        assert_eq!(out, DeliveryOutcome { sent: 3, failed: 0 });
        let msgs = n.messages();
        assert!(msgs.iter().all(|m| m.chars().count() <= MAX_MESSAGE_CHARS));
        assert_eq!(msgs.concat().matches('x').count(), 5000);
        assert!(msgs[2].starts_with("*GDP*"));
    }

    #[test]
    fn batch_joins_sections_with_separator() {
        let msgs = render_batch(
            &[result("A", Some("USD"), "one"), result("B", None, "two")],
            MAX_MESSAGE_CHARS,
        );
        assert_eq!(msgs.len(), 1);
        assert_eq!(
            msgs[0],
            format!("{BATCH_HEADER}\n\nA (USD) - Medium\none\n\n---\n\nB - Medium\ntwo")
        );
    }

    #[test]
    fn batch_splits_on_section_boundaries() {
        let long = "x".repeat(60);
        let results = vec![
            result("A", None, &long),
            result("B", None, &long),
            result("C", None, &long),
        ];
        let msgs = render_batch(&results, 150);
        assert!(msgs.len() >= 2);
        assert!(msgs.iter().all(|m| m.chars().count() <= 150));
        let joined = msgs.join("");
        for t in ["A - Medium", "B - Medium", "C - Medium"] {
            assert_eq!(joined.matches(t).count(), 1);
        }
    }

    #[test]
    fn oversized_section_is_hard_split() {
        let msgs = pack_sections("", &["y".repeat(25)], "|", 10);
        assert_eq!(msgs, vec!["y".repeat(10), "y".repeat(10), "y".repeat(5)]);
    }

    #[test]
    fn header_is_never_sent_alone() {
        let msgs = pack_sections("HDR\n", &["y".repeat(25)], "|", 10);
        assert_eq!(
            msgs,
            vec![format!("HDR\n{}", "y".repeat(6)), "y".repeat(10), "y".repeat(9)]
        );

        let big = render_batch(&[result("A", None, &"z".repeat(5000))], MAX_MESSAGE_CHARS);
        assert!(big[0].starts_with(BATCH_HEADER));
        assert!(big[0].contains("A - Medium"));
        assert!(big.iter().all(|m| m.chars().count() <= MAX_MESSAGE_CHARS));
    }

    #[test]
    fn parse_delivery_mode() {
        assert_eq!("per-event".parse::<DeliveryMode>().unwrap(), DeliveryMode::PerEvent);
        assert_eq!("Batched".parse::<DeliveryMode>().unwrap(), DeliveryMode::Batched);
        assert!("carrier-pigeon".parse::<DeliveryMode>().is_err());
    }

    #[tokio::test]
    async fn empty_input_sends_single_notice() {
        let n = RecordingNotifier::new();
        let out = deliver(&[], &n, DeliveryMode::PerEvent).await;
        assert_eq!(out, DeliveryOutcome { sent: 1, failed: 0 });
        assert_eq!(n.messages(), vec![NO_EVENTS_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn per_event_failure_does_not_stop_remaining_sends() {
        let n = RecordingNotifier::new().failing_on("Broken");
        let results = vec![
            result("First", None, "a"),
            result("Broken", None, "b"),
            result("Third", None, "c"),
        ];
        let out = deliver(&results, &n, DeliveryMode::PerEvent).await;
        assert_eq!(out, DeliveryOutcome { sent: 2, failed: 1 });
        assert_eq!(n.messages().len(), 2);
    }

    #[tokio::test]
    async fn batched_failure_ends_attempt() {
        let n = RecordingNotifier::new().failing_on("Broken");
        let out = deliver(&[result("Broken", None, "b")], &n, DeliveryMode::Batched).await;
        assert_eq!(out, DeliveryOutcome { sent: 0, failed: 1 });
        assert!(n.messages().is_empty());
    }
}
