// src/ingest/types.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::FetchError;

/// Ordinal importance of a calendar event. `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Importance {
    Low,
    Medium,
    High,
}

impl Importance {
    /// Exact-match mapping of a source impact label. Anything that is not
    /// literally `High`, `Medium` or `Low` does not map.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(Importance::High),
            "Medium" => Some(Importance::Medium),
            "Low" => Some(Importance::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "Low",
            Importance::Medium => "Medium",
            Importance::High => "High",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source record before normalization. Both adapters fill the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub title: Option<String>,
    pub currency: Option<String>,
    pub impact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub title: String,
    pub currency: Option<String>,
    pub importance: Importance,
}

#[async_trait::async_trait]
pub trait CalendarSource: Send + Sync {
    /// One request, one parse pass. `date` is the local calendar day being asked for.
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<RawEvent>, FetchError>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_is_ordinal() {
        assert!(Importance::Low < Importance::Medium);
        assert!(Importance::Medium < Importance::High);
    }

    #[test]
    fn labels_map_by_exact_match_only() {
        assert_eq!(Importance::from_label("High"), Some(Importance::High));
        assert_eq!(Importance::from_label("Medium"), Some(Importance::Medium));
        assert_eq!(Importance::from_label("Low"), Some(Importance::Low));
        assert_eq!(Importance::from_label("high"), None);
        assert_eq!(Importance::from_label(" High"), None);
        assert_eq!(Importance::from_label("None"), None);
        assert_eq!(Importance::from_label(""), None);
    }
}
