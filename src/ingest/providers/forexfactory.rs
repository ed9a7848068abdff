// src/ingest/providers/forexfactory.rs
//! HTML calendar scraper. The class names below belong to a third-party page and
//! may change without notice; all of that coupling lives in this file.

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::histogram;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::errors::FetchError;
use crate::ingest::types::{CalendarSource, RawEvent};

pub const DEFAULT_URL: &str = "https://www.forexfactory.com/calendar.php";

const ROW_CLASS: &str = "calendar__row";
const IMPACT_CELL: &str = "calendar__impact";
const EVENT_CELL: &str = "calendar__event";
const CURRENCY_CELL: &str = "calendar__currency";
const IMPACT_ICON: &str = "impact-icon";

pub struct ForexFactoryProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl ForexFactoryProvider {
    pub fn from_fixture(html: &str) -> Self {
        Self {
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn new() -> Self {
        Self::with_url(DEFAULT_URL.to_string())
    }

    pub fn with_url(url: String) -> Self {
        Self {
            mode: Mode::Http {
                url,
                client: super::http_client(),
            },
        }
    }

    /// Walk `tr.calendar__row` rows. Rows without an impact cell, without an
    /// impact icon, or without an event title are skipped.
    pub fn parse_html(html: &str) -> Vec<RawEvent> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::new();

        for row in re_row().captures_iter(html) {
            if !has_class(&row[1], ROW_CLASS) {
                continue;
            }
            let cells = Cells::from_row(&row[2]);

            let Some(impact_html) = cells.impact else {
                continue;
            };
            let Some(icon_classes) = impact_icon_classes(impact_html) else {
                continue;
            };
            let Some(title) = cells.event else {
                continue;
            };

            out.push(RawEvent {
                title: Some(title.to_string()),
                currency: cells.currency.map(str::to_string),
                impact: impact_label(&icon_classes).map(str::to_string),
            });
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        out
    }
}

impl Default for ForexFactoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Cells<'a> {
    impact: Option<&'a str>,
    event: Option<&'a str>,
    currency: Option<&'a str>,
}

impl<'a> Cells<'a> {
    fn from_row(row_html: &'a str) -> Self {
        let mut cells = Cells::default();
        for cap in re_cell().captures_iter(row_html) {
            let (Some(attrs), Some(inner)) = (cap.get(1), cap.get(2)) else {
                continue;
            };
            let attrs = attrs.as_str();
            let inner = inner.as_str();
            if cells.impact.is_none() && has_class(attrs, IMPACT_CELL) {
                cells.impact = Some(inner);
            } else if cells.event.is_none() && has_class(attrs, EVENT_CELL) {
                cells.event = Some(inner);
            } else if cells.currency.is_none() && has_class(attrs, CURRENCY_CELL) {
                cells.currency = Some(inner);
            }
        }
        cells
    }
}

fn re_row() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<tr\b([^>]*)>(.*?)</tr>").unwrap())
}

fn re_cell() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<td\b([^>]*)>(.*?)</td>").unwrap())
}

fn re_span() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<span\b([^>]*)>").unwrap())
}

fn re_class_attr() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bclass\s*=\s*["']([^"']*)["']"#).unwrap())
}

fn class_list(attrs: &str) -> Vec<String> {
    re_class_attr()
        .captures(attrs)
        .map(|c| c[1].split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn has_class(attrs: &str, class: &str) -> bool {
    class_list(attrs).iter().any(|c| c == class)
}

fn impact_icon_classes(cell_html: &str) -> Option<Vec<String>> {
    re_span()
        .captures_iter(cell_html)
        .map(|c| class_list(&c[1]))
        .find(|classes| classes.iter().any(|c| c == IMPACT_ICON))
}

fn impact_label(classes: &[String]) -> Option<&'static str> {
    let has = |name: &str| classes.iter().any(|c| c == name);
    if has("impact-high") {
        Some("High")
    } else if has("impact-medium") {
        Some("Medium")
    } else if has("impact-low") {
        Some("Low")
    } else {
        None
    }
}

#[async_trait]
impl CalendarSource for ForexFactoryProvider {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawEvent>, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => Ok(Self::parse_html(s)),
            Mode::Http { url, client } => {
                // The page defaults to the current day; `date` is only logged.
                tracing::debug!(provider = "forexfactory", %date, url = %url, "fetching calendar page");
                let resp = client.get(url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Http {
                        status: status.as_u16(),
                    });
                }
                let body = resp.text().await?;
                Ok(Self::parse_html(&body))
            }
        }
    }

    fn name(&self) -> &'static str {
        "forexfactory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"
<table class="calendar__table">
  <tr class="calendar__row calendar__row--day-breaker"><td colspan="8">Mon Oct 19</td></tr>
  <tr class="calendar__row">
    <td class="calendar__cell calendar__time">8:30am</td>
    <td class="calendar__cell calendar__currency">USD</td>
    <td class="calendar__cell calendar__impact"><span class="impact-icon impact-high" title="High Impact Expected"></span></td>
    <td class="calendar__cell calendar__event"><span class="calendar__event-title">CPI m/m</span></td>
  </tr>
  <tr class="calendar__row">
    <td class="calendar__cell calendar__currency">EUR</td>
    <td class="calendar__cell calendar__impact"><span class="impact-icon impact-holiday"></span></td>
    <td class="calendar__cell calendar__event">Bank Holiday</td>
  </tr>
  <tr class="calendar__row">
    <td class="calendar__cell calendar__currency">GBP</td>
    <td class="calendar__cell calendar__impact"></td>
    <td class="calendar__cell calendar__event">No icon</td>
  </tr>
</table>"#;

    #[test]
    fn extracts_rows_with_impact_icons() {
        let out = ForexFactoryProvider::parse_html(ROWS);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].impact.as_deref(), Some("High"));
        assert_eq!(out[0].currency.as_deref(), Some("USD"));
        assert!(out[0].title.as_deref().unwrap().contains("CPI m/m"));
        assert_eq!(out[1].impact, None);
    }

    #[test]
    fn class_matching_is_token_based() {
        assert!(has_class(r#"class="calendar__row foo""#, "calendar__row"));
        assert!(!has_class(r#"class="calendar__row--new""#, "calendar__row"));
    }
}
