// src/errors.rs
//! Error taxonomy. Each kind is handled at the boundary that can recover from it:
//! fetch → empty event list, generation → fallback text, delivery → log and move on.
//! Only `ConfigError` is allowed to stop the process (at startup).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("calendar source returned HTTP {status}")]
    Http { status: u16 },

    #[error("calendar request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("calendar payload could not be parsed: {message}")]
    Parse { message: String },
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("completion API returned HTTP {status}")]
    Http { status: u16 },

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API returned an empty answer")]
    EmptyResponse,

    #[error("completion response malformed: {message}")]
    Malformed { message: String },

    #[error("commentary generation is disabled")]
    Disabled,
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("delivery channel returned HTTP {status}")]
    Http { status: u16 },

    #[error("delivery request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("delivery channel rejected the message: {description}")]
    Rejected { description: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("config file {path}: {message}")]
    File { path: String, message: String },
}
