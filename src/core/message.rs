use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a code was derived from its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Filename,
    Ocr,
    Regex,
    Llm,
    /// Pushed by an operator through the broadcast endpoint
    Manual,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Filename => "filename",
            Self::Ocr => "ocr",
            Self::Regex => "regex",
            Self::Llm => "llm",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// A promotional code extracted from a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub raw: String,
    pub normalized: String,
    pub message_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub method: ExtractionMethod,
}

impl Code {
    pub fn new(raw: impl Into<String>, method: ExtractionMethod) -> Self {
        let raw = raw.into().trim().to_string();
        let normalized = raw.to_lowercase();
        Self {
            raw,
            normalized,
            message_id: None,
            chat_id: None,
            method,
        }
    }

    /// Attach the message the code came from
    pub fn with_origin(mut self, chat_id: i64, message_id: i64) -> Self {
        self.chat_id = Some(chat_id);
        self.message_id = Some(message_id);
        self
    }
}

/// Frames pushed to WebSocket clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    Connected {
        client_id: String,
    },
    CodeDrop {
        code: String,
        method: ExtractionMethod,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<i64>,
        ts: i64,
    },
    Ping {
        ts: i64,
    },
}

impl RelayEvent {
    pub fn code_drop(code: &Code) -> Self {
        Self::CodeDrop {
            code: code.raw.clone(),
            method: code.method,
            message_id: code.message_id,
            ts: Utc::now().timestamp(),
        }
    }

    pub fn ping() -> Self {
        Self::Ping {
            ts: Utc::now().timestamp(),
        }
    }
}
