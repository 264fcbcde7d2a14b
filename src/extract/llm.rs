//! Text-completion fallback for masked codes
//!
//! Some drops tease the code with characters blanked out (`fl_kex1_`).
//! A completion model is asked to fill the gaps; its answer is only trusted
//! if it looks like a code.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::LlmConfig;
use crate::error::{RelayError, Result};
use crate::extract::text::is_plausible_code;

const SYSTEM_PROMPT: &str = "You recover promotional bonus codes from chat messages. \
Some characters of the code are hidden behind underscores. \
Reply with the single most likely complete code and nothing else. \
Reply NONE if the message contains no code.";

/// Anything that can guess a masked code from message text
#[async_trait]
pub trait CodeCompleter: Send + Sync {
    async fn complete_code(&self, text: &str) -> Result<Option<String>>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible `chat/completions` client
pub struct CompletionClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(config: &LlmConfig, timeout: Duration) -> Result<Self> {
        let base = config.base_url.as_str().trim_end_matches('/');
        let endpoint = Url::parse(&format!("{}/chat/completions", base))
            .map_err(|e| RelayError::ConfigError(format!("Invalid LLM endpoint: {}", e)))?;

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Turn a model reply into a code, rejecting chatter and refusals
pub fn parse_completion(reply: &str) -> Option<String> {
    let candidate = reply
        .trim()
        .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.')
        .trim();

    if candidate.eq_ignore_ascii_case("none") || !is_plausible_code(candidate) {
        return None;
    }
    Some(candidate.to_string())
}

#[async_trait]
impl CodeCompleter for CompletionClient {
    async fn complete_code(&self, text: &str) -> Result<Option<String>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
            max_tokens: 16,
        };

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::HttpError(format!(
                "completion request failed: {} - {}",
                status, body
            )));
        }

        let parsed: ChatResponse = resp.json().await?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!("Completion reply: {:?}", reply);

        Ok(parse_completion(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_accepts_bare_code() {
        assert_eq!(parse_completion("flakex15\n"), Some("flakex15".to_string()));
        assert_eq!(parse_completion("`flakex15`"), Some("flakex15".to_string()));
    }

    #[test]
    fn test_parse_completion_rejects_refusals_and_prose() {
        assert_eq!(parse_completion("NONE"), None);
        assert_eq!(parse_completion("The code is probably flakex15"), None);
        assert_eq!(parse_completion(""), None);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = LlmConfig {
            base_url: Url::parse("https://api.example.com/v1").unwrap(),
            api_key: None,
            model: "test".to_string(),
        };
        let client = CompletionClient::new(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint().as_str(), "https://api.example.com/v1/chat/completions");
    }
}
