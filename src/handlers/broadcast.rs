//! Manual broadcast endpoint
//!
//! Operators and external scrapers POST JSON here to push it to every
//! connected client. A `code_drop` carrying a `code` goes through the relay
//! so it is deduplicated and reaches the sinks too; anything else is relayed
//! verbatim.

use log::{error, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

use crate::core::message::{Code, ExtractionMethod};
use crate::core::relay::{Delivery, Relay};
use crate::error::RelayError;
use crate::security::authorize;

#[derive(Debug, Serialize)]
pub struct BroadcastReply {
    pub ok: bool,
    pub clients: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

fn reply<T: Serialize>(body: &T, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn error_reply(message: &str, status: StatusCode) -> WithStatus<Json> {
    reply(&json!({ "error": message }), status)
}

/// The code of a `{"type":"code_drop","code":...}` body
fn code_drop_of(payload: &Value) -> Option<&str> {
    if payload.get("type").and_then(Value::as_str) != Some("code_drop") {
        return None;
    }
    payload
        .get("code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|code| !code.is_empty())
}

pub async fn handle_broadcast(
    auth_header: Option<String>,
    payload: Value,
    relay: Arc<Relay>,
    token: Option<Arc<str>>,
) -> Result<WithStatus<Json>, warp::Rejection> {
    if let Err(e) = authorize(token.as_deref(), auth_header.as_deref()) {
        warn!("Rejected manual broadcast: {}", e);
        return Ok(error_reply("unauthorized", StatusCode::UNAUTHORIZED));
    }

    if payload.is_null() {
        return Ok(error_reply("missing json body", StatusCode::BAD_REQUEST));
    }

    if let Some(code) = code_drop_of(&payload) {
        let code = Code::new(code, ExtractionMethod::Manual);
        return Ok(match relay.deliver(code).await {
            Ok(Delivery::Duplicate) => reply(
                &BroadcastReply { ok: true, clients: 0, duplicate: true },
                StatusCode::OK,
            ),
            Ok(Delivery::Sent { clients, .. }) => reply(
                &BroadcastReply { ok: true, clients, duplicate: false },
                StatusCode::OK,
            ),
            Err(e) => internal_error(e),
        });
    }

    let text = payload.to_string();
    Ok(match relay.hub().broadcast_text(&text) {
        Ok(clients) => reply(
            &BroadcastReply { ok: true, clients, duplicate: false },
            StatusCode::OK,
        ),
        Err(e) => internal_error(e),
    })
}

fn internal_error(e: RelayError) -> WithStatus<Json> {
    error!("Manual broadcast failed: {}", e);
    error_reply("broadcast failed", StatusCode::INTERNAL_SERVER_ERROR)
}
