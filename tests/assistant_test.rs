mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use carepay::config::ApiConfig;
use carepay::error::PaymentError;
use carepay::interfaces::http::assistant::AssistantClient;
use carepay::interfaces::http::client::{ApiClient, StaticToken};
use common::spawn_api;
use serde_json::{Value, json};

async fn assistant(router: Router) -> AssistantClient {
    let base = spawn_api(router).await;
    let config = ApiConfig::new(&base, Duration::from_secs(5)).unwrap();
    let api = ApiClient::new(&config, Arc::new(StaticToken::new(Some("t0k".into())))).unwrap();
    AssistantClient::new(api)
}

#[tokio::test]
async fn test_ask_posts_patient_message() {
    let client = assistant(Router::new().route(
        "/ai/ava",
        post(|Json(body): Json<Value>| async move {
            Json(json!({ "reply": format!("{} asked: {}", body["role"], body["message"]) }))
        }),
    ))
    .await;

    let reply = client.ask("When is my appointment?").await.unwrap();
    assert_eq!(reply.reply, r#""patient" asked: "When is my appointment?""#);
}

#[tokio::test]
async fn test_ask_failure_and_empty_message() {
    let client = assistant(Router::new().route(
        "/ai/ava",
        post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;

    let err = client.ask("hello").await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("Failed to fetch from Ava API"));

    assert!(matches!(
        client.ask("   ").await,
        Err(PaymentError::Validation(_))
    ));
}
