//! Bot API payloads, limited to the fields the relay reads

use serde::Deserialize;

/// Envelope returned by every Bot API method
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<u16>,
    pub description: Option<String>,
}

/// The bot account behind the token, as returned by `getMe`
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
    pub channel_post: Option<TelegramMessage>,
}

impl Update {
    /// The chat message carried by this update, from a group/DM or a channel
    pub fn into_message(self) -> Option<TelegramMessage> {
        self.message.or(self.channel_post)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaFile {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub video: Option<MediaFile>,
    pub animation: Option<MediaFile>,
    pub document: Option<MediaFile>,
}

impl TelegramMessage {
    /// Text body or media caption
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// The video-like attachment, if any. Documents only count when they
    /// carry a video mime type.
    pub fn video_media(&self) -> Option<&MediaFile> {
        self.video
            .as_ref()
            .or(self.animation.as_ref())
            .or_else(|| {
                self.document.as_ref().filter(|doc| {
                    doc.mime_type
                        .as_deref()
                        .map_or(false, |mime| mime.starts_with("video/"))
                })
            })
    }

    /// Short label used in debug logs
    pub fn kind(&self) -> &'static str {
        if self.video.is_some() {
            "video"
        } else if self.animation.is_some() {
            "animation"
        } else if self.document.is_some() {
            "document"
        } else if self.text.is_some() {
            "text"
        } else {
            "other"
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    pub file_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_post_update_parses() {
        let raw = r#"{
            "update_id": 10,
            "channel_post": {
                "message_id": 77,
                "chat": {"id": -1002472636693, "title": "Drops", "type": "channel"},
                "date": 1700000000,
                "caption": "New drop!",
                "video": {
                    "file_id": "BAAD",
                    "file_unique_id": "x",
                    "file_name": "Code Drop - Telegram Winter_flakex15.mp4",
                    "mime_type": "video/mp4",
                    "duration": 5
                }
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        let message = update.into_message().unwrap();
        assert_eq!(message.chat.id, -1002472636693);
        assert_eq!(message.kind(), "video");
        assert_eq!(message.body(), Some("New drop!"));
        assert_eq!(
            message.video_media().unwrap().file_name.as_deref(),
            Some("Code Drop - Telegram Winter_flakex15.mp4")
        );
    }

    #[test]
    fn test_error_envelope_parses() {
        let raw = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let envelope: ApiResponse<BotUser> = serde_json::from_str(raw).unwrap();
        assert!(!envelope.ok);
        assert!(envelope.result.is_none());
        assert_eq!(envelope.error_code, Some(401));
    }

    #[test]
    fn test_non_video_document_is_not_media() {
        let raw = r#"{
            "message_id": 1,
            "chat": {"id": 5},
            "document": {"file_id": "f", "file_name": "notes_abc1.pdf", "mime_type": "application/pdf"}
        }"#;

        let message: TelegramMessage = serde_json::from_str(raw).unwrap();
        assert!(message.video_media().is_none());
    }
}
