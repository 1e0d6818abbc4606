use axum::http::StatusCode;
use logbase_service::storage::ObjectStore;
use serde_json::{Value, json};

use crate::common::{ADMIN_TOKEN, PUBLIC_BASE, TestApp};

// 1x1 transparent PNG
const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

async fn create_post(app: &TestApp, payload: Value) -> Value {
    let response = app
        .server
        .post("/api/blog/create")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&payload)
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn test_create_post_uploads_inline_images() {
    let app = TestApp::new();

    let body = create_post(
        &app,
        json!({
            "title": "Hello from Logbase",
            "content": format!("Intro\n\n![chart](data:image/png;base64,{PIXEL})"),
            "description": "First post",
        }),
    )
    .await;

    assert_eq!(body["success"], true);
    let item = &body["item"];
    assert_eq!(item["feedType"], "logbase");
    assert_eq!(item["blogName"], "Logbase");
    assert_eq!(item["matchedKeywords"], json!([]));
    assert!(item["news_letter_sent_date"].is_null());

    let uploaded = body["uploadedImages"].as_array().unwrap();
    assert_eq!(uploaded.len(), 1);
    let path = uploaded[0].as_str().unwrap();
    assert!(path.starts_with("blog-images/") && path.ends_with("_0.png"));
    assert!(app.store.exists(path).await.unwrap());

    let content = item["content"].as_str().unwrap();
    assert!(!content.contains("data:image"));
    assert!(content.contains(&format!("![chart]({PUBLIC_BASE}/{path})")));
}

#[tokio::test]
async fn test_create_post_requires_title() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/blog/create")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "title": "  ", "content": "Body" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn test_get_post_resolves_bare_image_filenames() {
    let app = TestApp::new();
    app.store
        .put("blog-images/legacy.png", vec![1, 2, 3])
        .await
        .unwrap();

    let created = create_post(
        &app,
        json!({
            "title": "Migrated post",
            "content": "![old](legacy.png) and ![gone](missing.png)",
        }),
    )
    .await;
    let guid = created["item"]["guid"].as_str().unwrap();

    let response = app.server.get(&format!("/api/blog/{guid}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["item"]["content"],
        format!("![old]({PUBLIC_BASE}/blog-images/legacy.png) and ![gone](missing.png)")
    );
}

#[tokio::test]
async fn test_get_unknown_post_is_not_found() {
    let app = TestApp::new();

    let response = app.server.get("/api/blog/does-not-exist").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_update_post_and_schedule_for_newsletter() {
    let app = TestApp::new();
    let created = create_post(
        &app,
        json!({ "title": "Draft", "content": "Body", "author": "Kim" }),
    )
    .await;
    let guid = created["item"]["guid"].as_str().unwrap();

    let response = app
        .server
        .put(&format!("/api/blog/{guid}"))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({
            "title": "Published",
            "author": null,
            "news_letter_sent_date": "2025-03-10",
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["item"]["title"], "Published");
    assert!(body["item"]["author"].is_null());
    assert_eq!(body["item"]["content"], "Body");
    assert_eq!(body["item"]["news_letter_sent_date"], "2025-03-10");
}

#[tokio::test]
async fn test_update_requires_admin_and_fields() {
    let app = TestApp::new();
    let created = create_post(&app, json!({ "title": "Draft", "content": "Body" })).await;
    let guid = created["item"]["guid"].as_str().unwrap();

    let response = app
        .server
        .put(&format!("/api/blog/{guid}"))
        .json(&json!({ "title": "Hijacked" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .put(&format!("/api/blog/{guid}"))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .put("/api/blog/unknown")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "title": "Nothing" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters_by_feed_type() {
    let app = TestApp::new();
    create_post(&app, json!({ "title": "One", "content": "Body" })).await;
    create_post(&app, json!({ "title": "Two", "content": "Body" })).await;

    let response = app
        .server
        .get("/api/blog")
        .add_query_param("feedType", "logbase")
        .add_query_param("limit", 1)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["limit"], 1);

    let response = app
        .server
        .get("/api/blog")
        .add_query_param("feedType", "competitor")
        .await;
    let body: Value = response.json();
    assert_eq!(body["total"], 0);

    let response = app
        .server
        .get("/api/blog")
        .add_query_param("feedType", "podcast")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_unknown_post_uploads_nothing() {
    let app = TestApp::new();

    let response = app
        .server
        .put("/api/blog/unknown")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({
            "content": format!("![chart](data:image/png;base64,{PIXEL})"),
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(app.store.list("blog-images").await.unwrap().is_empty());
}
