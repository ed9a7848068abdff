// src/analyze/commentary.rs
use metrics::counter;
use serde::Serialize;

use crate::analyze::ai_adapter::Generator;
use crate::ingest::types::NormalizedEvent;

pub const FALLBACK_TEXT: &str = "No analysis available due to an error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentaryResult {
    pub event: NormalizedEvent,
    pub text: String,
    /// False when `text` is the fallback.
    pub generated: bool,
}

/// Prompt asking for a concise market-impact reading of one event.
pub fn build_prompt(event: &NormalizedEvent, language: &str) -> String {
    let subject = match &event.currency {
        Some(cur) => format!("\"{}\" ({cur})", event.title),
        None => format!("\"{}\"", event.title),
    };
    format!(
        "You are a financial markets expert. Here is today's economic calendar event:\n\
         Event: {subject} (impact: {importance})\n\n\
         Interpret what this event means for the currency and financial markets. \
         Describe the likely short-term and long-term market effects and, if it uses \
         difficult terms, briefly explain them (for example what CPI is). \
         Answer in {language}, concisely and clearly.",
        importance = event.importance,
    )
}

/// Never fails: a generation error is logged and replaced by `FALLBACK_TEXT`.
pub async fn enrich(
    event: NormalizedEvent,
    generator: &dyn Generator,
    language: &str,
) -> CommentaryResult {
    let prompt = build_prompt(&event, language);
    match generator.generate(&prompt).await {
        Ok(text) => CommentaryResult {
            event,
            text,
            generated: true,
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                provider = generator.provider_name(),
                event = %event.title,
                "commentary generation failed; using fallback"
            );
            counter!("commentary_fallback_total").increment(1);
            CommentaryResult {
                event,
                text: FALLBACK_TEXT.to_string(),
                generated: false,
            }
        }
    }
}

/// One generation call at a time, in input order.
pub async fn enrich_all(
    events: Vec<NormalizedEvent>,
    generator: &dyn Generator,
    language: &str,
) -> Vec<CommentaryResult> {
    let mut out = Vec::with_capacity(events.len());
    for ev in events {
        out.push(enrich(ev, generator, language).await);
    }
    out
}
