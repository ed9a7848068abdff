// src/api.rs
//! Liveness endpoint for hosting platforms. Exactly one route; it shares no
//! state with the pipeline and cannot trigger or observe a run.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;

pub const LIVENESS_BODY: &str = "Bot is running";

pub fn router() -> Router {
    Router::new().route("/", get(|| async { LIVENESS_BODY }))
}

/// Bind up front so a busy port fails startup instead of a background task.
pub async fn bind(port: u16) -> Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding liveness endpoint on port {port}"))
}

pub async fn serve(listener: TcpListener) -> Result<()> {
    axum::serve(listener, router())
        .await
        .context("liveness server stopped")
}
