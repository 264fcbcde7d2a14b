//! Long-polling watcher over the configured chats

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::TelegramConfig;
use crate::core::message::Code;
use crate::core::relay::{Delivery, Relay};
use crate::error::{RelayError, Result};
use crate::extract::Extractor;
use crate::sinks::telegram::format_code_message;
use crate::telegram::client::TelegramClient;
use crate::telegram::types::{MediaFile, TelegramMessage};

const MAX_BACKOFF_SECS: u64 = 60;

pub struct ChannelWatcher {
    client: TelegramClient,
    extractor: Arc<Extractor>,
    relay: Arc<Relay>,
    watch_chats: Vec<i64>,
    reply_in_source: bool,
    poll_timeout: Duration,
    download_timeout: Duration,
}

impl ChannelWatcher {
    pub fn new(
        client: TelegramClient,
        config: &TelegramConfig,
        extractor: Arc<Extractor>,
        relay: Arc<Relay>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            client,
            extractor,
            relay,
            watch_chats: config.watch_chats.clone(),
            reply_in_source: config.reply_in_source,
            poll_timeout: config.poll_timeout,
            download_timeout,
        }
    }

    /// Poll forever, backing off exponentially while the Bot API is unreachable.
    ///
    /// Only returns when the token is rejected.
    pub async fn run(&self) -> Result<()> {
        info!("Watching Telegram chats {:?}", self.watch_chats);

        let mut offset: Option<i64> = None;
        let mut backoff_secs = 1;

        loop {
            match self.client.get_updates(offset, self.poll_timeout).await {
                Ok(updates) => {
                    backoff_secs = 1;

                    for update in updates {
                        offset = Some(update.update_id + 1);
                        if let Some(message) = update.into_message() {
                            self.process_message(&message).await;
                        }
                    }
                }
                Err(RelayError::Unauthorized) => {
                    error!("Telegram rejected the bot token, stopping the watcher");
                    return Err(RelayError::Unauthorized);
                }
                Err(e) => {
                    warn!("Telegram polling error: {}. Retrying in {}s...", e, backoff_secs);
                    sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                }
            }
        }
    }

    pub fn is_watched(&self, chat_id: i64) -> bool {
        self.watch_chats.contains(&chat_id)
    }

    /// Extract and relay the code of one message, if it has one
    pub async fn process_message(&self, message: &TelegramMessage) -> Option<Delivery> {
        if !self.is_watched(message.chat.id) {
            return None;
        }

        debug!(
            "Message {} in chat {} ({}): {:?}",
            message.message_id,
            message.chat.id,
            message.kind(),
            message.body()
        );

        let Some(code) = self.extract(message).await else {
            warn!("No code found in message {}, ignoring", message.message_id);
            return None;
        };
        let code = code.with_origin(message.chat.id, message.message_id);

        let delivery = match self.relay.deliver(code.clone()).await {
            Ok(delivery) => delivery,
            Err(e) => {
                error!("Failed to relay code {}: {}", code.raw, e);
                return None;
            }
        };

        if self.reply_in_source && delivery != Delivery::Duplicate {
            if let Err(e) = self
                .client
                .send_message(message.chat.id, &format_code_message(&code))
                .await
            {
                warn!("Failed to reply in chat {}: {}", message.chat.id, e);
            }
        }

        Some(delivery)
    }

    async fn extract(&self, message: &TelegramMessage) -> Option<Code> {
        if let Some(media) = message.video_media() {
            if let Some(code) = self.extractor.from_filename(media.file_name.as_deref()) {
                return Some(code);
            }
            if self.extractor.ocr_enabled() {
                info!("Filename failed, starting OCR on message {}", message.message_id);
                if let Some(code) = self.ocr_media(media).await {
                    return Some(code);
                }
            }
        }

        match message.body() {
            Some(text) => self.extractor.from_text(text).await,
            None => None,
        }
    }

    async fn ocr_media(&self, media: &MediaFile) -> Option<Code> {
        let file_path = match self.client.get_file_path(&media.file_id).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Could not resolve media {}: {}", media.file_id, e);
                return None;
            }
        };

        // Removed when dropped, whatever the OCR outcome
        let download = match tempfile::Builder::new().prefix("drop-").suffix(".mp4").tempfile() {
            Ok(file) => file,
            Err(e) => {
                error!("Could not create temporary file: {}", e);
                return None;
            }
        };

        match self
            .client
            .download_file(&file_path, download.path(), self.download_timeout)
            .await
        {
            Ok(bytes) => debug!("Downloaded {} bytes to {}", bytes, download.path().display()),
            Err(e) => {
                warn!("Could not download media {}: {}", media.file_id, e);
                return None;
            }
        }

        self.extractor.from_video(download.path()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::core::{create_hub, Connection, SeenCodes};
    use crate::extract::TextExtractor;
    use tokio::sync::mpsc;

    fn watcher(relay: Arc<Relay>) -> ChannelWatcher {
        let mut config = RelayConfig::default().telegram;
        config.watch_chats = vec![-100];
        // Never contacted: text and filename paths stay offline
        let client = TelegramClient::with_api_base(
            "0:test".to_string(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_millis(200),
        );
        let extractor = Arc::new(Extractor::new(TextExtractor::new(), None));
        ChannelWatcher::new(client, &config, extractor, relay, Duration::from_secs(1))
    }

    fn message(raw: &str) -> TelegramMessage {
        serde_json::from_str(raw).unwrap()
    }

    #[tokio::test]
    async fn test_unwatched_chat_is_ignored() {
        let relay = Arc::new(Relay::new(create_hub()));
        let watcher = watcher(relay);
        let msg = message(r#"{"message_id": 1, "chat": {"id": 42}, "text": "Code: winter24"}"#);
        assert_eq!(watcher.process_message(&msg).await, None);
    }

    #[tokio::test]
    async fn test_video_filename_code_is_relayed() {
        let hub = create_hub();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register(Connection::new(tx)).unwrap();
        let relay = Arc::new(Relay::new(hub.clone()).with_dedup(SeenCodes::new(8).unwrap()));
        let watcher = watcher(relay);

        let msg = message(
            r#"{"message_id": 7, "chat": {"id": -100},
                "video": {"file_id": "f", "file_name": "Code Drop - Telegram Winter_flakex15.mp4"}}"#,
        );
        let delivery = watcher.process_message(&msg).await;
        assert_eq!(
            delivery,
            Some(Delivery::Sent { clients: 1, sinks_ok: 0, sinks_failed: 0 })
        );

        let frame = rx.try_recv().unwrap();
        let json: serde_json::Value = serde_json::from_str(frame.to_str().unwrap()).unwrap();
        assert_eq!(json["code"], "flakex15");
        assert_eq!(json["method"], "filename");
        assert_eq!(json["message_id"], 7);

        // Same drop reposted
        assert_eq!(watcher.process_message(&msg).await, Some(Delivery::Duplicate));
    }

    #[tokio::test]
    async fn test_caption_is_used_when_filename_has_no_code() {
        let relay = Arc::new(Relay::new(create_hub()));
        let watcher = watcher(relay);
        let msg = message(
            r#"{"message_id": 8, "chat": {"id": -100}, "caption": "Code: winter24",
                "animation": {"file_id": "f", "file_name": "NoUnderscore.mp4"}}"#,
        );
        assert!(matches!(
            watcher.process_message(&msg).await,
            Some(Delivery::Sent { .. })
        ));
    }

    #[tokio::test]
    async fn test_message_without_code_is_dropped() {
        let relay = Arc::new(Relay::new(create_hub()));
        let watcher = watcher(relay);
        let msg = message(r#"{"message_id": 9, "chat": {"id": -100}, "text": "gm everyone"}"#);
        assert_eq!(watcher.process_message(&msg).await, None);
    }
}
