//! Relay configuration module
//! Collects every tunable of the relay into one object injected at startup

use crate::constants::{
    DEFAULT_BACKEND_EVENT_TYPE, DEFAULT_FRAME_OFFSET_MS, DEFAULT_HOST, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_KEEPALIVE_SECS, DEFAULT_LLM_MODEL, DEFAULT_OCR_TIMEOUT_SECS, DEFAULT_POLL_TIMEOUT_SECS,
    DEFAULT_PORT, DEFAULT_SEEN_CAPACITY,
};
use crate::error::{RelayError, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const ENV_PREFIX: &str = "DROP_RELAY_";

/// Event types accepted by the delivery backend
const BACKEND_EVENT_TYPES: &[&str] = &["code_drop", "stake_bonus_code"];

/// Relay configuration parameters
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Interval between heartbeat pings pushed to every client
    pub keepalive_interval: Duration,
    /// Optional bearer token guarding the manual broadcast endpoint
    pub broadcast_token: Option<String>,
    pub telegram: TelegramConfig,
    pub backend: Option<BackendConfig>,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
    pub dedup: DedupConfig,
    pub ocr: OcrConfig,
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token; the source and the Telegram sink are disabled without it
    pub bot_token: Option<String>,
    /// Chats whose messages are scanned for codes
    pub watch_chats: Vec<i64>,
    /// Chats that receive every delivered code
    pub notify_chats: Vec<i64>,
    /// Reply with the extracted code in the chat it came from
    pub reply_in_source: bool,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Url,
    pub event_type: String,
}

#[derive(Debug, Clone)]
pub struct DedupConfig {
    pub enabled: bool,
    pub capacity: usize,
    /// Append-only file of seen codes, reloaded at startup
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub enabled: bool,
    pub ffmpeg_path: String,
    pub tesseract_path: String,
    /// Position of the grabbed frame inside the video
    pub frame_offset: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: Url,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            keepalive_interval: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            broadcast_token: None,
            telegram: TelegramConfig {
                bot_token: None,
                watch_chats: Vec::new(),
                notify_chats: Vec::new(),
                reply_in_source: false,
                poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            },
            backend: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            dedup: DedupConfig {
                enabled: true,
                capacity: DEFAULT_SEEN_CAPACITY,
                log_path: None,
            },
            ocr: OcrConfig {
                enabled: true,
                ffmpeg_path: "ffmpeg".to_string(),
                tesseract_path: "tesseract".to_string(),
                frame_offset: Duration::from_millis(DEFAULT_FRAME_OFFSET_MS),
                timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
            },
            llm: None,
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Keys are the full variable names (`DROP_RELAY_PORT`, ...). Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let host = get("HOST").unwrap_or(defaults.host);
        // Hosting platforms hand out the listening port through a bare PORT
        let port = match get("PORT").or_else(|| lookup("PORT")) {
            Some(raw) => parse_value("PORT", &raw)?,
            None => defaults.port,
        };

        let keepalive_interval = parse_secs(get("KEEPALIVE_SECS"), "KEEPALIVE_SECS", defaults.keepalive_interval)?;
        if keepalive_interval.is_zero() {
            return Err(RelayError::ConfigError(
                "DROP_RELAY_KEEPALIVE_SECS must be greater than zero".to_string(),
            ));
        }

        let telegram = TelegramConfig {
            bot_token: get("TELEGRAM_TOKEN"),
            watch_chats: parse_chat_list(get("WATCH_CHATS"), "WATCH_CHATS")?,
            notify_chats: parse_chat_list(get("NOTIFY_CHATS"), "NOTIFY_CHATS")?,
            reply_in_source: parse_flag(get("REPLY_IN_SOURCE"), defaults.telegram.reply_in_source),
            poll_timeout: parse_secs(get("POLL_TIMEOUT_SECS"), "POLL_TIMEOUT_SECS", defaults.telegram.poll_timeout)?,
        };

        if telegram.bot_token.is_none() && !telegram.watch_chats.is_empty() {
            return Err(RelayError::ConfigError(
                "DROP_RELAY_WATCH_CHATS is set but DROP_RELAY_TELEGRAM_TOKEN is missing".to_string(),
            ));
        }

        let backend = match get("BACKEND_URL") {
            Some(raw) => {
                let event_type = get("BACKEND_EVENT_TYPE")
                    .unwrap_or_else(|| DEFAULT_BACKEND_EVENT_TYPE.to_string());
                if !BACKEND_EVENT_TYPES.contains(&event_type.as_str()) {
                    return Err(RelayError::ConfigError(format!(
                        "Unsupported backend event type '{}', expected one of {:?}",
                        event_type, BACKEND_EVENT_TYPES
                    )));
                }
                Some(BackendConfig {
                    url: parse_url("BACKEND_URL", &raw)?,
                    event_type,
                })
            }
            None => None,
        };

        let dedup = DedupConfig {
            enabled: parse_flag(get("DEDUP"), defaults.dedup.enabled),
            capacity: match get("SEEN_CAPACITY") {
                Some(raw) => parse_value("SEEN_CAPACITY", &raw)?,
                None => defaults.dedup.capacity,
            },
            log_path: get("SEEN_LOG").map(PathBuf::from),
        };
        if dedup.capacity == 0 {
            return Err(RelayError::ConfigError(
                "DROP_RELAY_SEEN_CAPACITY must be greater than zero".to_string(),
            ));
        }

        let ocr = OcrConfig {
            enabled: parse_flag(get("OCR"), defaults.ocr.enabled),
            ffmpeg_path: get("FFMPEG").unwrap_or(defaults.ocr.ffmpeg_path),
            tesseract_path: get("TESSERACT").unwrap_or(defaults.ocr.tesseract_path),
            frame_offset: match get("FRAME_OFFSET_MS") {
                Some(raw) => Duration::from_millis(parse_value("FRAME_OFFSET_MS", &raw)?),
                None => defaults.ocr.frame_offset,
            },
            timeout: parse_secs(get("OCR_TIMEOUT_SECS"), "OCR_TIMEOUT_SECS", defaults.ocr.timeout)?,
        };

        let llm = match get("LLM_URL") {
            Some(raw) => Some(LlmConfig {
                base_url: parse_url("LLM_URL", &raw)?,
                api_key: get("LLM_KEY"),
                model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            }),
            None => None,
        };

        Ok(Self {
            host,
            port,
            keepalive_interval,
            broadcast_token: get("BROADCAST_TOKEN"),
            telegram,
            backend,
            http_timeout: parse_secs(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
            dedup,
            ocr,
            llm,
        })
    }

    /// Whether the Telegram source should be started
    pub fn source_enabled(&self) -> bool {
        self.telegram.bot_token.is_some() && !self.telegram.watch_chats.is_empty()
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        RelayError::ConfigError(format!("Invalid value for {}{}: '{}'", ENV_PREFIX, name, raw))
    })
}

fn parse_secs(raw: Option<String>, name: &str, default: Duration) -> Result<Duration> {
    match raw {
        Some(raw) => Ok(Duration::from_secs(parse_value(name, &raw)?)),
        None => Ok(default),
    }
}

fn parse_flag(raw: Option<String>, default: bool) -> bool {
    raw.map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(default)
}

fn parse_url(name: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        RelayError::ConfigError(format!("Invalid URL for {}{}: {}", ENV_PREFIX, name, e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RelayError::ConfigError(format!(
            "{}{} must be an http(s) URL, got scheme '{}'",
            ENV_PREFIX, name, other
        ))),
    }
}

fn parse_chat_list(raw: Option<String>, name: &str) -> Result<Vec<i64>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| parse_value(name, id))
        .collect()
}
