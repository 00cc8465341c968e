//! HTTP contract tests: the router is served on an ephemeral port with
//! in-memory upstream clients.

mod common;

use serde_json::{json, Value};
use std::sync::Arc;

use common::*;
use trim_advisor::ontology::FallbackPolicy;
use trim_advisor::server::router;

async fn start_server(chat: Arc<ScriptedChat>) -> u16 {
    let embedder = Arc::new(FixedEmbedder::new(vec![1.0, 0.0, 0.0]));
    let advisor = Arc::new(advisor(FallbackPolicy::Permissive, chat, embedder));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router(advisor)).await.ok();
    });
    wait_for_server(port).await;
    port
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn post_recommend(port: u16, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/recommend", port))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health_reports_catalog_size() {
    let port = start_server(Arc::new(ScriptedChat::new(&[]))).await;
    let body: Value = reqwest::get(format!("http://127.0.0.1:{}/health", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["trims"], 3);
}

#[tokio::test]
async fn test_recommend_returns_grounded_result() {
    let chat = Arc::new(ScriptedChat::new(&[
        PROFILE_HEATED_BLIND_SPOT,
        FINAL_GROUNDED,
    ]));
    let port = start_server(chat).await;

    let (status, body) = post_recommend(
        port,
        json!({ "features": "heated seats and blind spot", "purpose": "road trips" }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["result"]["top_5"][0]["id"], "rav4-xle");
    assert_eq!(body["result"]["top_5"][0]["model"], "RAV4");
    assert_eq!(
        body["result"]["top_5"][0]["recommended_customizations"],
        json!(["Cold Weather"])
    );
    assert_eq!(body["candidates"][0]["suggested_packages"], json!(["Cold Weather"]));
    assert_eq!(body["profile"]["powertrain_pref"], "hybrid");
}

#[tokio::test]
async fn test_empty_candidates_is_422() {
    let chat = Arc::new(ScriptedChat::new(&[PROFILE_SUNROOF]));
    let port = start_server(chat).await;

    let (status, body) = post_recommend(port, json!({ "features": "sunroof" })).await;

    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "empty_candidates");
}

#[tokio::test]
async fn test_extraction_failure_carries_raw_output() {
    let chat = Arc::new(ScriptedChat::new(&["Sorry, I can't help with that."]));
    let port = start_server(chat).await;

    let (status, body) = post_recommend(port, json!({ "purpose": "commuting" })).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "extraction_error");
    assert_eq!(body["error"]["raw"], "Sorry, I can't help with that.");
}

#[tokio::test]
async fn test_blank_answers_rejected_without_upstream_calls() {
    let chat = Arc::new(ScriptedChat::new(&[]));
    let port = start_server(chat.clone()).await;

    let (status, body) = post_recommend(port, json!({ "purpose": "   " })).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(chat.calls(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let chat = Arc::new(ScriptedChat::new(&[]));
    let port = start_server(chat).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/recommend", port))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}
