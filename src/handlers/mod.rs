//! Request handlers for the relay's HTTP surface

pub mod broadcast;
pub mod websocket;

use std::convert::Infallible;
use std::sync::Arc;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

use crate::constants::{BROADCAST_PATH, MAX_BROADCAST_BODY_BYTES, WS_PATH};
use crate::core::hub::SharedHub;
use crate::core::relay::Relay;
use crate::security::with_api_security_headers;

pub use broadcast::handle_broadcast;
pub use websocket::handle_ws_client;

const BANNER: &str = "drop-relay is running";

/// Every route the server exposes, CORS included
pub fn routes(
    relay: Arc<Relay>,
    broadcast_token: Option<String>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let hub = relay.hub().clone();
    let token: Option<Arc<str>> = broadcast_token.map(Arc::from);

    let index = warp::path::end()
        .and(warp::get())
        .map(|| with_api_security_headers(BANNER));

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| with_api_security_headers("OK"));

    let ws = warp::path(WS_PATH)
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_hub(hub))
        .map(|ws: warp::ws::Ws, hub: SharedHub| {
            ws.on_upgrade(move |socket| handle_ws_client(socket, hub))
        });

    let send = warp::path(BROADCAST_PATH)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::content_length_limit(MAX_BROADCAST_BODY_BYTES))
        .and(warp::body::json())
        .and(with_relay(relay))
        .and(with_token(token))
        .and_then(handle_broadcast)
        .map(|reply: WithStatus<Json>| with_api_security_headers(reply));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    index.or(health).or(ws).or(send).with(cors)
}

// Helpers to include shared state in requests
fn with_hub(hub: SharedHub) -> impl Filter<Extract = (SharedHub,), Error = Infallible> + Clone {
    warp::any().map(move || hub.clone())
}

fn with_relay(relay: Arc<Relay>) -> impl Filter<Extract = (Arc<Relay>,), Error = Infallible> + Clone {
    warp::any().map(move || relay.clone())
}

fn with_token(
    token: Option<Arc<str>>,
) -> impl Filter<Extract = (Option<Arc<str>>,), Error = Infallible> + Clone {
    warp::any().map(move || token.clone())
}
