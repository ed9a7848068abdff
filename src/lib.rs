// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod scheduler;
pub mod telemetry;

// Calendar sources, normalization and the importance filter
pub mod ingest;

// Commentary generation
pub mod analyze;

// Delivery channels
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{CommentaryResult, FALLBACK_TEXT};
pub use crate::config::BotConfig;
pub use crate::ingest::types::{Importance, NormalizedEvent, RawEvent};
pub use crate::pipeline::{Pipeline, RunReport};
