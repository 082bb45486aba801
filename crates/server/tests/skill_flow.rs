//! End-to-end skill flow through the HTTP router
//!
//! A local axum server stands in for the LLM vendor; the skill router is
//! driven with `tower::ServiceExt::oneshot`.

use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::post,
    Json, Router,
};
use naturetalk_core::config::AppConfig;
use naturetalk_core::errors::{NOT_SUPPORTED_MESSAGE, NOT_UNDERSTOOD_MESSAGE, UNHANDLED_FAULT_MESSAGE};
use naturetalk_server::{bootstrap::bootstrap_with_config, http::app_router};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY_ENV: &str = "NATURETALK_TEST_FLOW_API_KEY";

async fn fake_messages(Json(body): Json<Value>) -> Json<Value> {
    let last = body["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|message| message["content"].as_str())
        .unwrap_or_default()
        .to_owned();

    let text = if last.contains("照明") {
        "```json\n{\"response\": \"照明をつけました\", \"actions\": [{\"device\": \"light\", \"command\": \"on\", \"value\": 80}]}\n```".to_owned()
    } else if last.contains("壊れ") {
        "I'm not JSON".to_owned()
    } else {
        json!({"response": format!("{last}ですね"), "actions": []}).to_string()
    };

    Json(json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "usage": {"input_tokens": 12, "output_tokens": 7}
    }))
}

async fn spawn_fake_vendor() -> String {
    let app = Router::new().route("/v1/messages", post(fake_messages));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{address}")
}

async fn skill_app() -> Router {
    env::set_var(API_KEY_ENV, "sk-flow-test");
    let mut config = AppConfig::default();
    config.credentials.api_key_env = API_KEY_ENV.to_owned();
    config.llm.base_url = spawn_fake_vendor().await;

    let app = bootstrap_with_config(config).await.expect("bootstrap");
    app_router(&app)
}

async fn post_event(app: &Router, path: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&bytes).expect("json"))
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&bytes).expect("json"))
}

fn free_talk(text: &str, attributes: Value) -> String {
    json!({
        "version": "1.0",
        "session": {"new": false, "sessionId": "s-flow", "attributes": attributes},
        "request": {
            "type": "IntentRequest",
            "requestId": "req-flow",
            "locale": "ja-JP",
            "intent": {"name": "FreeTalkIntent", "slots": {"UserInput": {"name": "UserInput", "value": text}}}
        }
    })
    .to_string()
}

fn speech(envelope: &Value) -> &str {
    envelope["response"]["outputSpeech"]["ssml"]
        .as_str()
        .and_then(|ssml| ssml.strip_prefix("<speak>"))
        .and_then(|ssml| ssml.strip_suffix("</speak>"))
        .unwrap_or_default()
}

#[tokio::test]
async fn device_request_updates_state_and_history() {
    let app = skill_app().await;

    let (status, envelope) = post_event(&app, "/skill", free_talk("照明をつけて", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(speech(&envelope), "照明をつけました");
    assert_eq!(envelope["response"]["shouldEndSession"], json!(false));
    assert_eq!(
        envelope["sessionAttributes"]["history"],
        json!([
            {"role": "user", "content": "照明をつけて"},
            {"role": "assistant", "content": "照明をつけました"}
        ])
    );

    let (status, health) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["credential"]["status"], json!("ready"));
    assert_eq!(health["devices"]["light"], json!({"status": "on", "brightness": 80.0}));
    assert_eq!(health["devices"]["aircon"], json!({"status": "off", "temperature": 25.0}));
}

#[tokio::test]
async fn history_from_previous_turn_is_carried_forward() {
    let app = skill_app().await;
    let previous = json!({"history": [
        {"role": "user", "content": "暑い"},
        {"role": "assistant", "content": "エアコンをつけましょうか？"}
    ]});

    let (_, envelope) = post_event(&app, "/", free_talk("お願い", previous)).await;

    assert_eq!(speech(&envelope), "お願いですね");
    assert_eq!(envelope["sessionAttributes"]["history"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn unparseable_llm_reply_asks_user_to_repeat() {
    let app = skill_app().await;

    let (status, envelope) = post_event(&app, "/skill", free_talk("壊れた返事", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(speech(&envelope), NOT_UNDERSTOOD_MESSAGE);
    assert_eq!(envelope["response"]["shouldEndSession"], json!(false));
}

#[tokio::test]
async fn unknown_intent_and_garbage_body_still_answer_200() {
    let app = skill_app().await;
    let unknown = json!({
        "request": {"type": "IntentRequest", "requestId": "req-x", "intent": {"name": "WeatherIntent"}}
    })
    .to_string();

    let (status, envelope) = post_event(&app, "/skill", unknown).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(speech(&envelope), NOT_SUPPORTED_MESSAGE);
    assert_eq!(envelope["response"]["shouldEndSession"], json!(true));

    let (status, envelope) = post_event(&app, "/skill", "not json".to_owned()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(speech(&envelope), UNHANDLED_FAULT_MESSAGE);
}

#[tokio::test]
async fn session_end_returns_empty_response() {
    let app = skill_app().await;
    let ended = json!({
        "request": {"type": "SessionEndedRequest", "requestId": "req-end", "reason": "USER_INITIATED"}
    })
    .to_string();

    let (status, envelope) = post_event(&app, "/skill", ended).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope, json!({"version": "1.0", "response": {}}));
}
