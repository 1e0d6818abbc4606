use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::{ADMIN_TOKEN, TestApp};

#[tokio::test]
async fn test_keyword_lifecycle() {
    let app = TestApp::new();

    let response = app.server.get("/api/keywords").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "success": true, "keywords": [] }));

    for keyword in ["logistics", " 물류 "] {
        app.server
            .post("/api/keywords")
            .authorization_bearer(ADMIN_TOKEN)
            .json(&json!({ "keyword": keyword }))
            .await
            .assert_status_ok();
    }

    let response = app
        .server
        .put("/api/keywords")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "from": "logistics", "to": "supply chain" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["keywords"], json!(["supply chain", "물류"]));

    let response = app
        .server
        .delete("/api/keywords")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "keyword": "물류" }))
        .await;
    response.assert_status_ok();

    let body: Value = app.server.get("/api/keywords").await.json();
    assert_eq!(body["keywords"], json!(["supply chain"]));
}

#[tokio::test]
async fn test_duplicate_keyword_conflicts() {
    let app = TestApp::new();
    app.seed_keywords(&["Logistics"]).await;

    let response = app
        .server
        .post("/api/keywords")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "keyword": "logistics" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_removing_unknown_keyword_is_not_found() {
    let app = TestApp::new();

    let response = app
        .server
        .delete("/api/keywords")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "keyword": "ghost" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_keyword_changes_require_admin() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/keywords")
        .json(&json!({ "keyword": "logistics" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}
