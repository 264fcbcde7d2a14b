// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const WS_PATH: &str = "ws";
pub const BROADCAST_PATH: &str = "send";

// Relay hub
pub const DEFAULT_KEEPALIVE_SECS: u64 = 20;
pub const MAX_BROADCAST_BODY_BYTES: u64 = 1024 * 1024;

// Outbound calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKEND_EVENT_TYPE: &str = "code_drop";

// Dedup
pub const DEFAULT_SEEN_CAPACITY: usize = 1024;

// OCR
pub const DEFAULT_FRAME_OFFSET_MS: u64 = 3000;
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;

// LLM
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
