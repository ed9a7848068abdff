// src/config/mod.rs
pub mod ai;
pub mod bot;

pub use ai::AiConfig;
pub use bot::{BotConfig, FileSettings, TelegramConfig};
