//! Telegram source adapter: Bot API client, update types and the watcher loop

pub mod client;
pub mod types;
pub mod watcher;

pub use client::TelegramClient;
pub use types::{BotUser, MediaFile, TelegramMessage, Update};
pub use watcher::ChannelWatcher;
