use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::{RelayError, Result};
use crate::telegram::types::{ApiResponse, BotUser, FileInfo, Update};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

// Telegram rejects messages above 4096 characters
const MAX_MESSAGE_CHARS: usize = 4000;

/// Thin Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    bot_token: String,
    api_base: String,
    request_timeout: Duration,
}

impl TelegramClient {
    pub fn new(bot_token: String, request_timeout: Duration) -> Self {
        Self::with_api_base(bot_token, DEFAULT_API_BASE.to_string(), request_timeout)
    }

    /// Point the client at another Bot API server (self-hosted or a test double)
    pub fn with_api_base(bot_token: String, api_base: String, request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value, timeout: Duration) -> Result<T> {
        let resp = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        // Revoked or mistyped token
        if status == StatusCode::UNAUTHORIZED {
            return Err(RelayError::Unauthorized);
        }
        let envelope: ApiResponse<T> = resp.json().await.map_err(|e| {
            RelayError::TelegramError(format!("{} returned unreadable body ({}): {}", method, status, e))
        })?;

        if !envelope.ok {
            if envelope.error_code == Some(StatusCode::UNAUTHORIZED.as_u16()) {
                return Err(RelayError::Unauthorized);
            }
            let reason = envelope.description.unwrap_or_else(|| status.to_string());
            return Err(RelayError::TelegramError(format!("{} failed: {}", method, reason)));
        }

        envelope
            .result
            .ok_or_else(|| RelayError::TelegramError(format!("{} returned no result", method)))
    }

    /// Check the token by asking who the bot is
    pub async fn get_me(&self) -> Result<BotUser> {
        self.call("getMe", json!({}), self.request_timeout).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "channel_post"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        // The HTTP request has to outlive the server-side long poll
        self.call("getUpdates", body, timeout + self.request_timeout).await
    }

    /// Resolve a file id to its download path on the Bot API file server
    pub async fn get_file_path(&self, file_id: &str) -> Result<String> {
        let info: FileInfo = self
            .call("getFile", json!({ "file_id": file_id }), self.request_timeout)
            .await?;

        info.file_path.ok_or_else(|| {
            RelayError::TelegramError(format!("getFile returned no path for {}", info.file_id))
        })
    }

    /// Stream a file from the Bot API file server to `dest`
    pub async fn download_file(&self, file_path: &str, dest: &Path, timeout: Duration) -> Result<u64> {
        let url = format!("{}/file/bot{}/{}", self.api_base, self.bot_token, file_path);
        let mut resp = self.client.get(url).timeout(timeout).send().await?;
        if !resp.status().is_success() {
            return Err(RelayError::TelegramError(format!(
                "file download failed with status {}",
                resp.status()
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    /// Send a text message, split into chunks under the Bot API limit
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text) {
            let body = json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            let _: Value = self.call("sendMessage", body, self.request_timeout).await?;
        }
        Ok(())
    }
}

fn split_message(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(MAX_MESSAGE_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
