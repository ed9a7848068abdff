pub mod forexfactory;
pub mod jblanked_api;

use std::time::Duration;

/// Shared HTTP client settings for calendar sources.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (compatible; econ-calendar-bot/0.1)")
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}
