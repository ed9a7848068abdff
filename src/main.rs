//! Economic calendar bot: binary entrypoint.
//! Validates configuration, starts the liveness endpoint, then runs the
//! daily trigger loop on the main task.

use anyhow::{Context, Result};
use chrono::Local;

use econ_calendar_bot::{
    api,
    config::BotConfig,
    pipeline::Pipeline,
    scheduler::{self, DailyTrigger},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = BotConfig::from_env().context("loading configuration")?;
    tracing::info!(
        source = ?cfg.source.kind,
        delivery = ?cfg.delivery_mode,
        trigger_time = %cfg.trigger_time,
        port = cfg.port,
        dry_run = cfg.dry_run,
        model = %cfg.ai.model,
        "configuration loaded"
    );

    let pipeline = Pipeline::from_config(&cfg)?;

    let listener = api::bind(cfg.port).await?;
    tokio::spawn(async move {
        if let Err(e) = api::serve(listener).await {
            tracing::error!(error = ?e, "liveness endpoint stopped");
        }
    });
    tracing::info!(port = cfg.port, "liveness endpoint listening");

    let trigger = DailyTrigger::new(cfg.trigger_time, Local::now().naive_local());
    let pipeline = &pipeline;
    scheduler::run_forever(trigger, cfg.poll_interval, |date| async move {
        pipeline.run(date).await;
    })
    .await;

    Ok(())
}
