// src/analyze/mod.rs
//! Commentary stage: prompt building, generation provider, fallback handling.

pub mod ai_adapter;
pub mod commentary;

// Re-export convenient types.
pub use crate::analyze::ai_adapter::{build_generator, DynGenerator, Generator, MockGenerator};
pub use crate::analyze::commentary::{enrich, enrich_all, CommentaryResult, FALLBACK_TEXT};
