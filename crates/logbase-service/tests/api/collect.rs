use std::sync::{Arc, Mutex};

use axum::{Router, extract::State, http::StatusCode, routing::get};
use logbase_service::{
    AppState,
    models::FeedType,
    repositories::{ItemRepository, ListItemsParams},
};
use serde_json::{Value, json};

use crate::common::{ADMIN_TOKEN, TestApp, spawn_mock};

const DAY: &str = "2025-03-09";

fn rss(items: &[(&str, &str, &str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(guid, title, pub_date, description)| {
            format!(
                "<item><title>{title}</title><link>https://blog.example.com/{guid}</link>\
                 <guid>{guid}</guid><pubDate>{pub_date}</pubDate>\
                 <description>{description}</description></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Feed</title>\
         <link>https://blog.example.com</link><description>Feed</description>{items}</channel></rss>"
    )
}

type FeedBody = Arc<Mutex<String>>;

async fn serve_feed(State(body): State<FeedBody>) -> ([(&'static str, &'static str); 1], String) {
    let body = body.lock().unwrap().clone();
    ([("content-type", "application/rss+xml")], body)
}

/// A feed server whose document can be swapped between runs.
async fn feed_server(initial: String) -> (String, FeedBody) {
    let body: FeedBody = Arc::new(Mutex::new(initial));
    let router = Router::new()
        .route("/rss", get(serve_feed))
        .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }))
        .with_state(body.clone());
    (spawn_mock(router).await, body)
}

async fn collect(app: &TestApp) -> Value {
    let response = app
        .server
        .post("/api/rss-collect")
        .add_query_param("date", DAY)
        .authorization_bearer(ADMIN_TOKEN)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    body["report"].clone()
}

#[tokio::test]
async fn test_collect_filters_by_window_and_keywords() {
    // 2025-03-09 in Asia/Seoul spans 2025-03-08T15:00Z .. 2025-03-09T15:00Z.
    let competitor = rss(&[
        ("c-1", "First of the day", "Sat, 08 Mar 2025 15:00:00 +0000", "Opening"),
        ("c-2", "Last of the day", "Sun, 09 Mar 2025 14:59:59 +0000", "R&D & Ops"),
        ("c-3", "Already today", "Sun, 09 Mar 2025 15:00:00 +0000", "Too new"),
    ]);
    let noncompetitor = rss(&[
        ("n-1", "Logistics outlook", "Sun, 09 Mar 2025 03:00:00 +0000", "Freight"),
        ("n-2", "Cooking tips", "Sun, 09 Mar 2025 03:00:00 +0000", "Pasta"),
    ]);
    let (competitor_url, _) = feed_server(competitor).await;
    let (noncompetitor_url, _) = feed_server(noncompetitor).await;

    let app = TestApp::new();
    app.seed_feeds(&[
        ("Rival", &format!("{competitor_url}/rss"), FeedType::Competitor),
        ("Trade News", &format!("{noncompetitor_url}/rss"), FeedType::Noncompetitor),
    ])
    .await;
    app.seed_keywords(&["logistics", "R&D"]).await;

    let report = collect(&app).await;
    assert_eq!(report["totalFetched"], 5);
    assert_eq!(report["totalFiltered"], 3);
    assert_eq!(report["saved"], 3);
    assert_eq!(report["failedFeeds"], 0);
    assert_eq!(report["windowDay"], DAY);

    let items = app.state.items();
    let last = items.find_by_guid("c-2").await.unwrap().unwrap();
    assert_eq!(last.blog_name, "Rival");
    assert_eq!(last.feed_type, FeedType::Competitor);
    assert_eq!(last.matched_keywords.0, vec!["R&D".to_string()]);
    assert_eq!(last.description.as_deref(), Some("R&D & Ops"));

    let first = items.find_by_guid("c-1").await.unwrap().unwrap();
    assert!(first.matched_keywords.0.is_empty());

    assert!(items.find_by_guid("c-3").await.unwrap().is_none());
    assert!(items.find_by_guid("n-2").await.unwrap().is_none());
    let kept = items.find_by_guid("n-1").await.unwrap().unwrap();
    assert_eq!(kept.matched_keywords.0, vec!["logistics".to_string()]);
}

#[tokio::test]
async fn test_second_collection_does_not_duplicate_items() {
    let first_cycle = rss(&[
        ("a-1", "Port congestion eases", "Sun, 09 Mar 2025 01:00:00 +0000", "Ports"),
        ("a-2", "New depot opens", "Sun, 09 Mar 2025 02:00:00 +0000", "Depots"),
    ]);
    let (url, body) = feed_server(first_cycle).await;

    let app = TestApp::new();
    app.seed_feeds(&[("Rival", &format!("{url}/rss"), FeedType::Competitor)])
        .await;

    let report = collect(&app).await;
    assert_eq!(report["saved"], 2);

    // Same title and blog under a new guid, plus one genuinely new entry.
    *body.lock().unwrap() = rss(&[
        ("a-1-republished", "Port congestion eases", "Sun, 09 Mar 2025 01:00:00 +0000", "Ports"),
        ("a-2", "New depot opens", "Sun, 09 Mar 2025 02:00:00 +0000", "Depots"),
        ("a-3", "Rail freight record", "Sun, 09 Mar 2025 04:00:00 +0000", "Rail"),
    ]);

    let report = collect(&app).await;
    assert_eq!(report["saved"], 1);
    assert_eq!(report["skipped"], 2);

    let listed = app
        .state
        .items()
        .list(&ListItemsParams::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 3);
    assert!(
        app.state
            .items()
            .find_by_guid("a-1-republished")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_collect_continues_past_failing_feed() {
    let (url, _) = feed_server(rss(&[(
        "ok-1",
        "Still collected",
        "Sun, 09 Mar 2025 05:00:00 +0000",
        "Fine",
    )]))
    .await;

    let app = TestApp::new();
    app.seed_feeds(&[
        ("Broken", &format!("{url}/broken"), FeedType::Competitor),
        ("Working", &format!("{url}/rss"), FeedType::Competitor),
    ])
    .await;

    let report = collect(&app).await;
    assert_eq!(report["failedFeeds"], 1);
    assert_eq!(report["saved"], 1);
    assert_eq!(report["feeds"][0]["name"], "Broken");
    assert!(report["feeds"][0]["error"].is_string());
}

#[tokio::test]
async fn test_collect_rejects_malformed_date() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/rss-collect")
        .add_query_param("date", "09-03-2025")
        .authorization_bearer(ADMIN_TOKEN)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_items_by_guid() {
    let (url, _) = feed_server(rss(&[(
        "d-1",
        "To be removed",
        "Sun, 09 Mar 2025 05:00:00 +0000",
        "Bye",
    )]))
    .await;
    let app = TestApp::new();
    app.seed_feeds(&[("Rival", &format!("{url}/rss"), FeedType::Competitor)])
        .await;
    collect(&app).await;

    let response = app
        .server
        .post("/api/rss-migrate/delete")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "guids": ["d-1", "unknown"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["deleted"], json!(["d-1"]));
    assert_eq!(body["notFound"], json!(["unknown"]));
    assert!(app.state.items().find_by_guid("d-1").await.unwrap().is_none());
}
