//! HTTP backend sink
//!
//! POSTs every code as JSON to a configured URL, the way the collector
//! backends of the code-drop scripts expect it.

use async_trait::async_trait;
use chrono::Utc;
use log::info;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::config::BackendConfig;
use crate::core::message::{Code, ExtractionMethod};
use crate::error::{RelayError, Result};
use crate::sinks::Sink;

#[derive(Debug, Serialize)]
pub struct BackendPayload<'a> {
    #[serde(rename = "type")]
    pub event_type: &'a str,
    pub code: &'a str,
    pub method: ExtractionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    pub ts: i64,
}

pub struct BackendSink {
    client: Client,
    url: Url,
    event_type: String,
    timeout: Duration,
}

impl BackendSink {
    pub fn new(config: &BackendConfig, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: config.url.clone(),
            event_type: config.event_type.clone(),
            timeout,
        }
    }

    pub fn payload<'a>(&'a self, code: &'a Code) -> BackendPayload<'a> {
        BackendPayload {
            event_type: &self.event_type,
            code: &code.raw,
            method: code.method,
            message_id: code.message_id,
            ts: Utc::now().timestamp(),
        }
    }
}

#[async_trait]
impl Sink for BackendSink {
    fn name(&self) -> &str {
        "backend"
    }

    async fn deliver(&self, code: &Code) -> Result<()> {
        let resp = self
            .client
            .post(self.url.clone())
            .timeout(self.timeout)
            .json(&self.payload(code))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            info!("Backend accepted code {} ({})", code.raw, status);
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(RelayError::SinkError {
                sink: self.name().to_string(),
                reason: format!("{} - {}", status, body),
            })
        }
    }
}
