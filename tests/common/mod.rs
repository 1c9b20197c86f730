#![allow(dead_code)]

use std::sync::Arc;

use assessment_backend::{
    config::{Config, LogFormat},
    database::MemoryStore,
    routes, AppState,
};
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: None,
        database_max_connections: 1,
        submission_grace_seconds: 30,
        expiry_sweep_seconds: 60,
        max_body_bytes: 64 * 1024,
        log_format: LogFormat::Pretty,
    }
}

pub fn app() -> (Router, AppState) {
    let config = test_config();
    let state = AppState::new(Arc::new(MemoryStore::new()), &config);
    (routes::build_router(state.clone(), config.max_body_bytes), state)
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

/// Three questions worth 2 + 3 + 5 points; pass threshold 5.
pub fn screening_template() -> JsonValue {
    json!({
        "title": "Backend screening",
        "description": "Core Rust knowledge",
        "passScoreThreshold": 5,
        "timeLimitMinutes": 30,
        "questions": [
            {
                "text": "Which keyword declares an immutable binding?",
                "type": "single_choice",
                "options": ["let", "mut", "var"],
                "correctAnswer": "let",
                "points": 2
            },
            {
                "text": "Which are smart pointers?",
                "type": "multiple_choice",
                "options": ["Box", "Rc", "i32"],
                "correctAnswer": ["Box", "Rc"],
                "points": 3
            },
            {
                "text": "Explain the borrow checker.",
                "type": "free_text",
                "points": 5
            }
        ]
    })
}

pub async fn create_template(app: &Router, body: JsonValue) -> JsonValue {
    let (status, detail) = call(app, Method::POST, "/templates", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", detail);
    detail
}

pub fn question_ids(detail: &JsonValue) -> Vec<String> {
    detail["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_str().unwrap().to_string())
        .collect()
}
