use async_trait::async_trait;
use log::warn;

use crate::core::message::Code;
use crate::error::{RelayError, Result};
use crate::sinks::Sink;
use crate::telegram::TelegramClient;

/// Forwards each code to a fixed set of Telegram chats
pub struct TelegramSink {
    client: TelegramClient,
    chats: Vec<i64>,
}

impl TelegramSink {
    pub fn new(client: TelegramClient, chats: Vec<i64>) -> Self {
        Self { client, chats }
    }
}

pub fn format_code_message(code: &Code) -> String {
    format!("✅ Extracted Code: {}", code.raw)
}

#[async_trait]
impl Sink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, code: &Code) -> Result<()> {
        let text = format_code_message(code);
        let mut failed = Vec::new();

        for chat_id in &self.chats {
            if let Err(e) = self.client.send_message(*chat_id, &text).await {
                warn!("Failed to notify chat {}: {}", chat_id, e);
                failed.push(*chat_id);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(RelayError::SinkError {
                sink: self.name().to_string(),
                reason: format!("{} of {} chats failed: {:?}", failed.len(), self.chats.len(), failed),
            })
        }
    }
}
