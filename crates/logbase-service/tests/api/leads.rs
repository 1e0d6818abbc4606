use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use logbase_service::{AppState, models::SubscriberStatus, repositories::SubscriberRepository};
use serde_json::{Value, json};

use crate::common::{TestApp, spawn_mock};

type Received = Arc<Mutex<Vec<Value>>>;

async fn record(State(received): State<Received>, Json(payload): Json<Value>) -> &'static str {
    received.lock().unwrap().push(payload);
    "ok"
}

/// A Slack webhook stand-in: `/hook` records payloads, `/fail` errors.
async fn slack_server() -> (String, Received) {
    let received: Received = Arc::default();
    let router = Router::new()
        .route("/hook", post(record))
        .route(
            "/fail",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "invalid_token") }),
        )
        .with_state(received.clone());
    (spawn_mock(router).await, received)
}

#[tokio::test]
async fn test_inquiry_is_posted_to_slack() {
    let (slack, received) = slack_server().await;
    let app = TestApp::with_config(|config| {
        config.slack.inquiry = Some(format!("{slack}/hook"));
    });

    let response = app
        .server
        .post("/api/inquiry-to-slack")
        .json(&json!({
            "name": "홍길동",
            "email": "gildong@example.com",
            "phone": "010 1234 5678",
            "company": "Logbase",
            "message": "Please send a demo",
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let blocks = received[0]["blocks"].as_array().unwrap();
    assert_eq!(blocks[0]["type"], "header");
    let fields = blocks[1]["fields"].to_string();
    assert!(fields.contains("010-1234-5678"));
    assert!(fields.contains("gildong@example.com"));
}

#[tokio::test]
async fn test_inquiry_validation_errors() {
    let (slack, received) = slack_server().await;
    let app = TestApp::with_config(|config| {
        config.slack.inquiry = Some(format!("{slack}/hook"));
    });

    let response = app
        .server
        .post("/api/inquiry-to-slack")
        .json(&json!({
            "name": "Kim",
            "email": "kim@example",
            "phone": "01012345678",
            "message": "Hi",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/inquiry-to-slack")
        .json(&json!({
            "name": "Kim",
            "email": "kim@example.com",
            "phone": "0101234567",
            "message": "Hi",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_inquiry_without_webhook_is_unavailable() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/inquiry-to-slack")
        .json(&json!({
            "name": "Kim",
            "email": "kim@example.com",
            "phone": "01012345678",
            "message": "Hi",
        }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_slack_failure_is_bad_gateway() {
    let (slack, _) = slack_server().await;
    let app = TestApp::with_config(|config| {
        config.slack.contact = Some(format!("{slack}/fail"));
    });

    let response = app
        .server
        .post("/api/contact-to-slack")
        .json(&json!({
            "name": "Lee",
            "email": "lee@example.com",
            "message": "Partnership?",
        }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_contact_falls_back_to_inquiry_webhook() {
    let (slack, received) = slack_server().await;
    let app = TestApp::with_config(|config| {
        config.slack.inquiry = Some(format!("{slack}/hook"));
    });

    let response = app
        .server
        .post("/api/contact-to-slack")
        .json(&json!({
            "name": "Lee",
            "email": "lee@example.com",
            "subject": "Partnership",
            "message": "Let's talk",
        }))
        .await;

    response.assert_status_ok();
    let received = received.lock().unwrap();
    assert_eq!(received[0]["text"], "Partnership from Lee (lee@example.com)");
}

#[tokio::test]
async fn test_signup_saves_subscriber_even_when_slack_fails() {
    let (slack, _) = slack_server().await;
    let app = TestApp::with_config(|config| {
        config.slack.newsletter = Some(format!("{slack}/fail"));
    });

    let response = app
        .server
        .post("/api/newsletter-to-slack")
        .json(&json!({
            "name": "Park",
            "email": "Park@Example.com",
            "company": "Acme",
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({ "success": true, "notified": false, "saved": true })
    );

    let subscriber = app
        .state
        .subscribers()
        .find_by_email("park@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscriber.name, "Park");
    assert_eq!(subscriber.company.as_deref(), Some("Acme"));
    assert_eq!(subscriber.status, SubscriberStatus::Active);
}

#[tokio::test]
async fn test_repeated_signup_updates_subscriber() {
    let (slack, received) = slack_server().await;
    let app = TestApp::with_config(|config| {
        config.slack.newsletter = Some(format!("{slack}/hook"));
    });

    for company in ["Acme", "Globex"] {
        app.server
            .post("/api/newsletter-to-slack")
            .json(&json!({ "name": "Park", "email": "park@example.com", "company": company }))
            .await
            .assert_status_ok();
    }

    assert_eq!(received.lock().unwrap().len(), 2);
    let active = app.state.subscribers().list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].company.as_deref(), Some("Globex"));
}
