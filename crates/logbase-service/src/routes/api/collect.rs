use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::AppState;
use crate::blog::image_paths_in;
use crate::collector::{CollectionReport, CollectionWindow, collector_for, load_feeds};
use crate::errors::ApiError;
use crate::models::{FeedSource, FeedType};
use crate::repositories::ItemRepository;
use crate::routes::{AdminAuth, Success, success};
use crate::storage::ObjectStore;
use crate::validation::parse_date;

#[derive(Debug, Deserialize)]
struct CollectQuery {
    /// Collect a specific local day instead of yesterday.
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct CollectResponse {
    report: CollectionReport,
}

#[instrument(skip_all, fields(date = ?query.date))]
async fn collect<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Query(query): Query<CollectQuery>,
) -> Result<Json<Success<CollectResponse>>, ApiError> {
    let now = Utc::now();
    let collector = collector_for(&state);

    let report = match query.date.as_deref() {
        Some(date) => {
            let day = parse_date(date)?;
            let window = CollectionWindow::for_day(day, state.config().collect.timezone);
            collector.run_window(window, now).await?
        }
        None => collector.run(now).await?,
    };

    info!(
        saved = report.saved,
        skipped = report.skipped,
        failed_feeds = report.failed_feeds,
        "RSS collection triggered via API"
    );
    Ok(success(CollectResponse { report }))
}

#[derive(Debug, Deserialize)]
struct DeleteItemsRequest {
    guids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteItemsResponse {
    deleted: Vec<String>,
    not_found: Vec<String>,
    deleted_images: usize,
}

/// Removes items by guid, along with the blog images authored posts uploaded.
#[instrument(skip_all, fields(count = payload.guids.len()))]
async fn delete_items<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Json(payload): Json<DeleteItemsRequest>,
) -> Result<Json<Success<DeleteItemsResponse>>, ApiError> {
    if payload.guids.is_empty() {
        return Err(ApiError::BadRequest("guids must not be empty".to_string()));
    }

    let items = state.items();
    let store = state.store();
    let public_base = state.config().storage_public_url.clone();

    let mut response = DeleteItemsResponse {
        deleted: Vec::new(),
        not_found: Vec::new(),
        deleted_images: 0,
    };

    for guid in payload.guids {
        let Some(item) = items.delete(&guid).await? else {
            debug!(guid = %guid, "Item to delete not found");
            response.not_found.push(guid);
            continue;
        };

        if item.feed_type == FeedType::Logbase {
            let content = item.content.as_deref().unwrap_or_default();
            for path in image_paths_in(content, &public_base) {
                match store.delete(&path).await {
                    Ok(()) => response.deleted_images += 1,
                    Err(err) => warn!(path = %path, error = %err, "Failed to delete blog image"),
                }
            }
        }
        response.deleted.push(guid);
    }

    info!(
        deleted = response.deleted.len(),
        not_found = response.not_found.len(),
        "Deleted items"
    );
    Ok(success(response))
}

#[derive(Debug, Serialize)]
struct FeedsResponse {
    feeds: Vec<FeedSource>,
}

async fn list_feeds<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
) -> Result<Json<Success<FeedsResponse>>, ApiError> {
    let feeds = load_feeds(&state.store()).await?;
    Ok(success(FeedsResponse { feeds }))
}

pub fn router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/rss-collect", post(collect::<S>))
        .route("/rss-migrate/delete", post(delete_items::<S>))
        .route("/feeds", get(list_feeds::<S>))
}
