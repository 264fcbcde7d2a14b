// Integration tests for the extraction strategies

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::Filter;

use drop_relay::config::LlmConfig;
use drop_relay::core::ExtractionMethod;
use drop_relay::extract::{
    extract_from_filename, find_code, normalize_text, CodeCompleter, CompletionClient, Extractor,
    TextExtractor,
};

#[test]
fn test_filename_strategy() {
    assert_eq!(extract_from_filename("Drop_flakex15.mp4"), Some("flakex15".to_string()));
    assert_eq!(extract_from_filename("NoUnderscore.mp4"), None);
    assert_eq!(extract_from_filename("trailing_!!!.mp4"), None);
}

#[test]
fn test_regex_is_stable_under_normalization() {
    let samples = [
        "🎁 New drop! Code: ＷＩＮＴＥＲ２４",
        "bonus code - flаkе\u{200B}x15",
        "Claim now\n-stakeday",
        "nothing to see here",
    ];
    for sample in samples {
        let once = normalize_text(sample);
        assert_eq!(find_code(sample), find_code(&once));
        assert_eq!(normalize_text(&once), once);
    }
}

#[tokio::test]
async fn test_plain_text_goes_through_regex() {
    let extractor = Extractor::new(TextExtractor::new(), None);
    let code = extractor.from_text("New drop! Code: winter24").await.unwrap();
    assert_eq!(code.raw, "winter24");
    assert_eq!(code.method, ExtractionMethod::Regex);

    assert!(extractor.from_text("gm everyone").await.is_none());
}

// Spawns a fake chat/completions endpoint answering with `answer`
fn completion_server(answer: &'static str) -> (std::net::SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let requests: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let store = requests.clone();
    let route = warp::post()
        .and(warp::path!("v1" / "chat" / "completions"))
        .and(warp::body::json())
        .map(move |body: Value| {
            store.lock().unwrap().push(body);
            warp::reply::json(&json!({
                "choices": [{"message": {"role": "assistant", "content": answer}}]
            }))
        });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, requests)
}

fn completion_client(addr: std::net::SocketAddr) -> CompletionClient {
    let config = LlmConfig {
        base_url: format!("http://{}/v1/", addr).parse().unwrap(),
        api_key: Some("test-key".to_string()),
        model: "test-model".to_string(),
    };
    CompletionClient::new(&config, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_masked_code_is_completed() {
    let (addr, requests) = completion_server("flakex15");
    let client = completion_client(addr);
    assert_eq!(client.endpoint().path(), "/v1/chat/completions");

    let extractor = Extractor::new(TextExtractor::with_completer(Arc::new(client)), None);
    let code = extractor.from_text("Guess it: fl_kex1_").await.unwrap();
    assert_eq!(code.raw, "flakex15");
    assert_eq!(code.method, ExtractionMethod::Llm);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "test-model");
    assert_eq!(requests[0]["temperature"], 0.0);
}

#[tokio::test]
async fn test_completion_refusal_is_none() {
    let (addr, _) = completion_server("NONE");
    let client = completion_client(addr);
    assert_eq!(client.complete_code("fl_kex1_").await.unwrap(), None);
}

#[tokio::test]
async fn test_unreachable_completion_falls_back_to_regex() {
    let config = LlmConfig {
        base_url: "http://127.0.0.1:9/v1".parse().unwrap(),
        api_key: None,
        model: "test-model".to_string(),
    };
    let client = CompletionClient::new(&config, Duration::from_millis(500)).unwrap();
    let extractor = Extractor::new(TextExtractor::with_completer(Arc::new(client)), None);

    // Masked teaser plus a regular code: the regex still finds the latter
    let code = extractor.from_text("Code: winter24 (or guess fl_kex1_)").await.unwrap();
    assert_eq!(code.method, ExtractionMethod::Regex);
    assert_eq!(code.raw, "winter24");
}
