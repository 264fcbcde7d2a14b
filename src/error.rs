use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug)]
pub enum RelayError {
    // Hub errors
    HubLock(String),

    // Messages errors
    MessageParseError(String),

    // Outbound errors
    HttpError(String),
    TelegramError(String),
    SinkError { sink: String, reason: String },

    // Extraction errors
    ExtractionError(String),
    IoError(String),

    // Auth errors
    Unauthorized,

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HubLock(msg) => write!(f, "Hub lock error: {}", msg),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            Self::TelegramError(msg) => write!(f, "Telegram API error: {}", msg),
            Self::SinkError { sink, reason } => write!(f, "Sink '{}' failed: {}", sink, reason),
            Self::ExtractionError(msg) => write!(f, "Extraction error: {}", msg),
            Self::IoError(msg) => write!(f, "I/O error: {}", msg),
            Self::Unauthorized => write!(f, "Unauthorized access"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RelayError {}

// Converting from PoisonError to facilitate poisoned mutex handling
impl<T> From<PoisonError<T>> for RelayError {
    fn from(err: PoisonError<T>) -> Self {
        RelayError::HubLock(format!("Mutex poisoned: {}", err))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::HttpError(format!("request timed out: {}", err))
        } else {
            RelayError::HttpError(err.to_string())
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::MessageParseError(err.to_string())
    }
}

// Generic result type for the relay
pub type Result<T> = std::result::Result<T, RelayError>;
