//! Run the daily pipeline immediately, ignoring the schedule and weekday gate.
//!
//! Usage: `run_once [YYYY-MM-DD]` (defaults to today, local time).
//! Combine with `DRY_RUN=1` to print messages to the log instead of posting.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use econ_calendar_bot::{config::BotConfig, pipeline::Pipeline, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let date = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d")
            .with_context(|| format!("invalid date argument {arg:?}, expected YYYY-MM-DD"))?,
        None => Local::now().date_naive(),
    };

    let cfg = BotConfig::from_env().context("loading configuration")?;
    let pipeline = Pipeline::from_config(&cfg)?;
    let report = pipeline.run(date).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
