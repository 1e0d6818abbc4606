use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
};
use logbase_service::{
    AppState,
    models::{NewSubscriber, SubscriberStatus},
    repositories::SubscriberRepository,
    storage::ObjectStore,
};
use serde_json::{Value, json};

use crate::common::{ADMIN_TOKEN, TestApp, spawn_mock};

const API_KEY: &str = "test-mailerlite-key";

#[derive(Debug, Clone)]
struct Call {
    method: Method,
    path: String,
    body: Value,
}

type Calls = Arc<Mutex<Vec<Call>>>;

/// Answers the MailerLite endpoints the sender uses. Subscribers whose email
/// starts with `taken` already exist; ones starting with `reject` are refused.
async fn mailerlite(
    State(calls): State<Calls>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let expected = format!("Bearer {API_KEY}");
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthenticated." })));
    }

    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let path = uri.path().to_string();
    calls.lock().unwrap().push(Call {
        method: method.clone(),
        path: path.clone(),
        body: body.clone(),
    });

    let email = body["email"].as_str().unwrap_or_default();
    match (method, path.as_str()) {
        (Method::POST, "/subscribers") if email.starts_with("taken") => {
            (StatusCode::CONFLICT, Json(json!({ "message": "exists" })))
        }
        (Method::POST, "/subscribers") if email.starts_with("reject") => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "invalid" })),
        ),
        (Method::POST, "/subscribers") => (StatusCode::CREATED, Json(json!({ "data": { "id": "1" } }))),
        (Method::GET, "/templates") => (StatusCode::OK, Json(json!({ "data": [] }))),
        // Numeric ids show up in some responses.
        (Method::POST, "/templates") => (StatusCode::CREATED, Json(json!({ "data": { "id": 42 } }))),
        (Method::POST, "/campaigns") => {
            (StatusCode::CREATED, Json(json!({ "data": { "id": "c-100" } })))
        }
        _ => (StatusCode::OK, Json(json!({ "data": {} }))),
    }
}

async fn mailerlite_server() -> (String, Calls) {
    let calls: Calls = Arc::default();
    let router = Router::new()
        .fallback(mailerlite)
        .with_state(calls.clone());
    (spawn_mock(router).await, calls)
}

fn mailerlite_app(base_url: &str) -> TestApp {
    let base_url = base_url.to_string();
    TestApp::with_config(move |config| {
        config.mailerlite.api_key = Some(API_KEY.to_string());
        config.mailerlite.base_url = base_url;
    })
}

async fn compose(app: &TestApp, payload: Value) -> Value {
    let response = app
        .server
        .post("/api/newsletter-create")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&payload)
        .await;
    response.assert_status_ok();
    response.json()
}

async fn schedule_post(app: &TestApp, title: &str, date: &str) {
    let created: Value = app
        .server
        .post("/api/blog/create")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "title": title, "content": "Body", "description": "Summary" }))
        .await
        .json();
    let guid = created["item"]["guid"].as_str().unwrap();
    app.server
        .put(&format!("/api/blog/{guid}"))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "news_letter_sent_date": date }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_create_newsletter_renders_template() {
    let app = TestApp::new();
    schedule_post(&app, "Scheduled <story>", "2025-03-10").await;
    schedule_post(&app, "Other week", "2025-03-17").await;

    let body = compose(
        &app,
        json!({
            "title": "Weekly & More",
            "content": "<p>Hello readers</p>",
            "sentDate": "2025-03-10",
            // Local addresses are never scraped; composing goes on without a preview.
            "url": "http://127.0.0.1/internal",
        }),
    )
    .await;

    let newsletter = &body["newsletter"];
    let filename = newsletter["filename"].as_str().unwrap();
    assert!(filename.starts_with("newsletter-2025-03-10-") && filename.ends_with(".html"));
    let path = newsletter["htmlFilePath"].as_str().unwrap();
    assert_eq!(path, format!("newsletters/{filename}"));
    assert!(body["publicUrl"].as_str().unwrap().ends_with(path));

    let html = String::from_utf8(app.store.get(path).await.unwrap()).unwrap();
    assert!(html.contains("Weekly &amp; More"));
    assert!(html.contains("2025-03-10"));
    assert!(html.contains("<p>Hello readers</p>"));
    assert!(html.contains("Scheduled &lt;story&gt;"));
    assert!(!html.contains("Other week"));
    assert!(!html.contains("{{"));

    let response = app
        .server
        .get("/api/newsletters")
        .authorization_bearer(ADMIN_TOKEN)
        .await;
    let listed: Value = response.json();
    assert_eq!(listed["newsletters"].as_array().unwrap().len(), 1);
    assert_eq!(listed["newsletters"][0]["title"], "Weekly & More");
}

#[tokio::test]
async fn test_stored_template_overrides_default() {
    let app = TestApp::new();
    app.store
        .put(
            "newsletters/template.html",
            b"<h1>{{title}}</h1><div>{{content}}</div>{{unknown}}".to_vec(),
        )
        .await
        .unwrap();

    let body = compose(
        &app,
        json!({ "title": "Custom", "content": "Body", "sentDate": "2025-03-10" }),
    )
    .await;

    let path = body["newsletter"]["htmlFilePath"].as_str().unwrap();
    let html = String::from_utf8(app.store.get(path).await.unwrap()).unwrap();
    assert_eq!(html, "<h1>Custom</h1><div>Body</div>");
}

#[tokio::test]
async fn test_update_newsletter_rewrites_html() {
    let app = TestApp::new();
    let created = compose(
        &app,
        json!({ "title": "Draft", "content": "Old body", "sentDate": "2025-03-10" }),
    )
    .await;
    let filename = created["newsletter"]["filename"].as_str().unwrap();

    let response = app
        .server
        .post("/api/newsletter-update")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "filename": filename, "content": "New body" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["newsletter"]["title"], "Draft");
    assert_eq!(body["newsletter"]["content"], "New body");
    assert!(body["newsletter"]["updatedAt"].is_string());

    let path = body["newsletter"]["htmlFilePath"].as_str().unwrap();
    let html = String::from_utf8(app.store.get(path).await.unwrap()).unwrap();
    assert!(html.contains("New body"));
    assert!(!html.contains("Old body"));

    let response = app
        .server
        .post("/api/newsletter-update")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "filename": "newsletter-missing.html", "title": "X" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_syncs_recipients_and_schedules_campaign() {
    let (base_url, calls) = mailerlite_server().await;
    let app = mailerlite_app(&base_url);
    let created = compose(
        &app,
        json!({ "title": "Weekly", "content": "Body", "sentDate": "2025-03-10" }),
    )
    .await;
    let filename = created["newsletter"]["filename"].as_str().unwrap();

    let response = app
        .server
        .post("/api/newsletter-send")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({
            "filename": filename,
            "subject": "This week in logistics",
            "recipients": [
                { "email": "new@example.com", "name": "New" },
                { "email": "taken@example.com", "name": "Taken", "company": "Acme" },
                { "email": "reject@example.com" },
            ],
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["campaignId"], "c-100");
    assert_eq!(body["synced"], 2);
    assert_eq!(body["failed"], json!(["reject@example.com"]));

    let calls = calls.lock().unwrap().clone();
    assert!(calls.iter().any(|call| {
        call.method == Method::PUT && call.path == "/subscribers/taken@example.com"
    }));

    let template = calls
        .iter()
        .find(|call| call.method == Method::POST && call.path == "/templates")
        .expect("template created");
    assert_eq!(template.body["name"], "Logbase Newsletter");
    assert!(template.body["html"].as_str().unwrap().contains("Weekly"));

    let campaign = calls
        .iter()
        .find(|call| call.path == "/campaigns")
        .expect("campaign created");
    assert_eq!(campaign.body["type"], "regular");
    assert_eq!(campaign.body["emails"][0]["subject"], "This week in logistics");
    assert_eq!(campaign.body["emails"][0]["template_id"], "42");

    let schedule = calls.last().unwrap();
    assert_eq!(schedule.path, "/campaigns/c-100/schedule");
    assert_eq!(schedule.body, json!({ "delivery": "instant" }));

    let listed: Value = app
        .server
        .get("/api/newsletters")
        .authorization_bearer(ADMIN_TOKEN)
        .await
        .json();
    let record = &listed["newsletters"][0];
    assert_eq!(record["campaignId"], "c-100");
    assert!(record["sentAt"].is_string());
    assert_eq!(record["recipients"].as_array().unwrap().len(), 2);
    assert_eq!(record["recipients"][1]["company"], "Acme");
}

#[tokio::test]
async fn test_send_defaults_to_active_subscribers() {
    let (base_url, calls) = mailerlite_server().await;
    let app = mailerlite_app(&base_url);
    for (email, status) in [
        ("active@example.com", SubscriberStatus::Active),
        ("left@example.com", SubscriberStatus::Inactive),
    ] {
        app.state
            .subscribers()
            .upsert_by_email(&NewSubscriber {
                email: email.to_string(),
                name: "Reader".to_string(),
                company: None,
                phone: None,
                status,
            })
            .await
            .unwrap();
    }
    let created = compose(
        &app,
        json!({ "title": "Weekly", "content": "Body", "sentDate": "2025-03-10" }),
    )
    .await;

    let response = app
        .server
        .post("/api/newsletter-send")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "filename": created["newsletter"]["filename"] }))
        .await;

    response.assert_status_ok();
    let synced: Vec<String> = calls
        .lock()
        .unwrap()
        .iter()
        .filter(|call| call.path == "/subscribers")
        .map(|call| call.body["email"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(synced, vec!["active@example.com".to_string()]);
}

#[tokio::test]
async fn test_test_mode_sends_only_to_test_recipients() {
    let (base_url, calls) = mailerlite_server().await;
    let base = base_url.clone();
    let app = TestApp::with_config(move |config| {
        config.mailerlite.api_key = Some(API_KEY.to_string());
        config.mailerlite.base_url = base;
        config.newsletter_test_mode = true;
        config.newsletter_test_recipients = vec!["qa@logbase.kr".to_string()];
    });
    let created = compose(
        &app,
        json!({ "title": "Weekly", "content": "Body", "sentDate": "2025-03-10" }),
    )
    .await;

    let response = app
        .server
        .post("/api/newsletter-send")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({
            "filename": created["newsletter"]["filename"],
            "recipients": [{ "email": "customer@example.com" }],
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["testMode"], true);
    let synced: Vec<Value> = calls
        .lock()
        .unwrap()
        .iter()
        .filter(|call| call.path == "/subscribers")
        .map(|call| call.body["email"].clone())
        .collect();
    assert_eq!(synced, vec![json!("qa@logbase.kr")]);
}

#[tokio::test]
async fn test_send_fails_when_no_recipient_syncs() {
    let (base_url, calls) = mailerlite_server().await;
    let app = mailerlite_app(&base_url);
    let created = compose(
        &app,
        json!({ "title": "Weekly", "content": "Body", "sentDate": "2025-03-10" }),
    )
    .await;

    let response = app
        .server
        .post("/api/newsletter-send")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({
            "filename": created["newsletter"]["filename"],
            "recipients": [{ "email": "reject@example.com" }],
        }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert!(
        !calls
            .lock()
            .unwrap()
            .iter()
            .any(|call| call.path == "/campaigns")
    );
}

#[tokio::test]
async fn test_send_without_mailerlite_key_is_unavailable() {
    let app = TestApp::new();
    let created = compose(
        &app,
        json!({ "title": "Weekly", "content": "Body", "sentDate": "2025-03-10" }),
    )
    .await;

    let response = app
        .server
        .post("/api/newsletter-send")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "filename": created["newsletter"]["filename"] }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
