// Integration tests for the Telegram client, sink and watcher against an
// in-process Bot API double

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use warp::http::StatusCode;
use warp::Filter;

use drop_relay::config::RelayConfig;
use drop_relay::core::{create_hub, Code, Connection, ExtractionMethod, Relay};
use drop_relay::error::RelayError;
use drop_relay::extract::{Extractor, TextExtractor};
use drop_relay::sinks::{Sink, TelegramSink};
use drop_relay::telegram::{ChannelWatcher, TelegramClient};

const VIDEO_BYTES: &str = "not really an mp4";

type Calls = Arc<Mutex<Vec<(String, Value)>>>;

// Serves `/bot<token>/<method>` through `respond` and `/file/bot<token>/videos/drop.mp4`
fn fake_bot_api<F>(respond: F) -> (SocketAddr, Calls)
where
    F: Fn(&str, &Value) -> (StatusCode, Value) + Clone + Send + Sync + 'static,
{
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let log = calls.clone();

    let methods = warp::post()
        .and(warp::path!(String / String))
        .and(warp::body::json())
        .map(move |_bot: String, method: String, body: Value| {
            let (status, reply) = respond(&method, &body);
            log.lock().unwrap().push((method, body));
            warp::reply::with_status(warp::reply::json(&reply), status)
        });

    let files = warp::get()
        .and(warp::path("file"))
        .and(warp::path::tail())
        .map(|tail: warp::path::Tail| {
            if tail.as_str().ends_with("videos/drop.mp4") {
                warp::reply::with_status(VIDEO_BYTES, StatusCode::OK)
            } else {
                warp::reply::with_status("missing", StatusCode::NOT_FOUND)
            }
        });

    let (addr, server) = warp::serve(methods.or(files)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, calls)
}

fn ok(result: Value) -> (StatusCode, Value) {
    (StatusCode::OK, json!({"ok": true, "result": result}))
}

fn unauthorized() -> (StatusCode, Value) {
    (
        StatusCode::UNAUTHORIZED,
        json!({"ok": false, "error_code": 401, "description": "Unauthorized"}),
    )
}

fn client(addr: SocketAddr) -> TelegramClient {
    TelegramClient::with_api_base(
        "123:abc".to_string(),
        format!("http://{}", addr),
        Duration::from_secs(5),
    )
}

fn watcher(client: TelegramClient, relay: Arc<Relay>) -> ChannelWatcher {
    let mut config = RelayConfig::default().telegram;
    config.watch_chats = vec![-100];
    config.poll_timeout = Duration::ZERO;
    let extractor = Arc::new(Extractor::new(TextExtractor::new(), None));
    ChannelWatcher::new(client, &config, extractor, relay, Duration::from_secs(5))
}

fn recorded(calls: &Calls, method: &str) -> Vec<Value> {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter(|(name, _)| name == method)
        .map(|(_, body)| body.clone())
        .collect()
}

#[tokio::test]
async fn test_get_me_identifies_the_bot() {
    let (addr, _) = fake_bot_api(|method, _| match method {
        "getMe" => ok(json!({"id": 42, "is_bot": true, "username": "drop_bot"})),
        _ => unauthorized(),
    });

    let bot = client(addr).get_me().await.unwrap();
    assert_eq!(bot.id, 42);
    assert_eq!(bot.username.as_deref(), Some("drop_bot"));
}

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let (addr, _) = fake_bot_api(|_, _| unauthorized());

    let result = client(addr).get_me().await;
    assert!(matches!(result, Err(RelayError::Unauthorized)));
}

#[tokio::test]
async fn test_watcher_stops_on_rejected_token() {
    let (addr, calls) = fake_bot_api(|_, _| unauthorized());
    let watcher = watcher(client(addr), Arc::new(Relay::new(create_hub())));

    let result = timeout(Duration::from_secs(5), watcher.run())
        .await
        .expect("Watcher kept retrying a rejected token");
    assert!(matches!(result, Err(RelayError::Unauthorized)));
    assert_eq!(recorded(&calls, "getUpdates").len(), 1);
}

#[tokio::test]
async fn test_get_updates_sends_offset_and_filter() {
    let (addr, calls) = fake_bot_api(|method, _| match method {
        "getUpdates" => ok(json!([
            {"update_id": 11, "channel_post": {"message_id": 1, "chat": {"id": -100}, "text": "gm"}}
        ])),
        _ => unauthorized(),
    });

    let updates = client(addr)
        .get_updates(Some(11), Duration::from_secs(0))
        .await
        .unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].update_id, 11);

    let bodies = recorded(&calls, "getUpdates");
    assert_eq!(bodies[0]["offset"], 11);
    assert_eq!(bodies[0]["timeout"], 0);
    assert_eq!(bodies[0]["allowed_updates"], json!(["message", "channel_post"]));
}

#[tokio::test]
async fn test_file_is_resolved_and_downloaded() {
    let (addr, calls) = fake_bot_api(|method, _| match method {
        "getFile" => ok(json!({"file_id": "BAAD", "file_path": "videos/drop.mp4"})),
        _ => unauthorized(),
    });
    let client = client(addr);

    let file_path = client.get_file_path("BAAD").await.unwrap();
    assert_eq!(file_path, "videos/drop.mp4");
    assert_eq!(recorded(&calls, "getFile")[0]["file_id"], "BAAD");

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("drop.mp4");
    let written = client
        .download_file(&file_path, &dest, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(written, VIDEO_BYTES.len() as u64);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), VIDEO_BYTES);
}

#[tokio::test]
async fn test_missing_file_download_fails() {
    let (addr, _) = fake_bot_api(|_, _| unauthorized());

    let dir = tempfile::tempdir().unwrap();
    let result = client(addr)
        .download_file("videos/gone.mp4", &dir.path().join("gone.mp4"), Duration::from_secs(5))
        .await;
    assert!(matches!(result, Err(RelayError::TelegramError(_))));
}

#[tokio::test]
async fn test_send_message_posts_chat_and_text() {
    let (addr, calls) = fake_bot_api(|method, _| match method {
        "sendMessage" => ok(json!({"message_id": 1})),
        _ => unauthorized(),
    });

    client(addr).send_message(-100, "hello").await.unwrap();

    let bodies = recorded(&calls, "sendMessage");
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["chat_id"], -100);
    assert_eq!(bodies[0]["text"], "hello");
}

#[tokio::test]
async fn test_telegram_sink_reports_failed_chat_and_notifies_the_rest() {
    let (addr, calls) = fake_bot_api(|method, body| match (method, body["chat_id"].as_i64()) {
        ("sendMessage", Some(-2)) => (
            StatusCode::BAD_REQUEST,
            json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}),
        ),
        ("sendMessage", _) => ok(json!({"message_id": 1})),
        _ => unauthorized(),
    });

    let sink = TelegramSink::new(client(addr), vec![-2, -1]);
    let result = sink.deliver(&Code::new("flakex15", ExtractionMethod::Filename)).await;
    assert!(matches!(result, Err(RelayError::SinkError { .. })));

    let bodies = recorded(&calls, "sendMessage");
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[1]["chat_id"], -1);
    assert_eq!(bodies[1]["text"], "✅ Extracted Code: flakex15");
}

#[tokio::test]
async fn test_watcher_relays_update_and_advances_offset() {
    let (addr, calls) = fake_bot_api(|method, body| match method {
        "getUpdates" if body.get("offset").is_none() => ok(json!([{
            "update_id": 5,
            "channel_post": {"message_id": 9, "chat": {"id": -100}, "text": "Code: winter24"}
        }])),
        "getUpdates" => ok(json!([])),
        _ => unauthorized(),
    });

    let hub = create_hub();
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.register(Connection::new(tx)).unwrap();
    let watcher = watcher(client(addr), Arc::new(Relay::new(hub)));
    let handle = tokio::spawn(async move { watcher.run().await });

    let mut advanced = false;
    for _ in 0..100 {
        if recorded(&calls, "getUpdates").iter().any(|body| body["offset"] == 6) {
            advanced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.abort();
    assert!(advanced, "Offset never moved past update 5");

    let frame = rx.try_recv().unwrap();
    let json: Value = serde_json::from_str(frame.to_str().unwrap()).unwrap();
    assert_eq!(json["type"], "code_drop");
    assert_eq!(json["code"], "winter24");
    assert_eq!(json["message_id"], 9);
}
