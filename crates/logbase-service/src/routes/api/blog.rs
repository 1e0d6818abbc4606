use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::AppState;
use crate::blog::{resolve_legacy_image_urls, upload_inline_images};
use crate::collector::local_date;
use crate::errors::ApiError;
use crate::models::{FeedType, Keywords, NewRssItem, RssItem, RssItemChanges};
use crate::repositories::{ItemRepository, ListItemsParams};
use crate::routes::{AdminAuth, Success, explicit_null, success};
use crate::validation::{optional, require};

/// Blog name authored posts are filed under.
pub const LOGBASE_BLOG_NAME: &str = "Logbase";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    feed_type: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    items: Vec<RssItem>,
    total: u64,
    limit: u32,
    offset: u32,
}

#[instrument(skip_all, fields(feed_type = ?query.feed_type, limit = query.limit, offset = query.offset))]
async fn list_items<S: AppState>(
    State(state): State<S>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Success<ListResponse>>, ApiError> {
    let feed_type = query
        .feed_type
        .as_deref()
        .map(str::parse::<FeedType>)
        .transpose()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    if query.limit == Some(0) {
        return Err(ApiError::BadRequest(
            "Limit must be greater than 0".to_string(),
        ));
    }

    let params = ListItemsParams {
        feed_type,
        limit: query.limit,
        offset: query.offset,
    };
    let result = state.items().list(&params).await?;

    debug!(returned = result.items.len(), total = result.total, "Listed items");
    Ok(success(ListResponse {
        total: result.total,
        limit: query.limit.unwrap_or(50),
        offset: query.offset.unwrap_or(0),
        items: result.items,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    description: Option<String>,
    author: Option<String>,
    pub_date: Option<DateTime<Utc>>,
    link: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostResponse {
    item: RssItem,
    uploaded_images: Vec<String>,
}

#[instrument(skip_all, fields(title = %payload.title))]
async fn create_post<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<Success<PostResponse>>, ApiError> {
    let title = require("title", &payload.title)?;
    let content = require("content", &payload.content)?;
    let now = Utc::now();

    let uploaded = upload_inline_images(&state.store(), &content, now).await?;

    let guid = Uuid::new_v4().to_string();
    let link = optional(payload.link).unwrap_or_else(|| format!("/blog/{guid}"));
    let new_item = NewRssItem {
        guid: guid.clone(),
        title,
        link,
        pub_date: Some(payload.pub_date.unwrap_or(now).naive_utc()),
        description: optional(payload.description),
        content: Some(uploaded.content),
        author: optional(payload.author),
        blog_name: LOGBASE_BLOG_NAME.to_string(),
        feed_type: FeedType::Logbase,
        matched_keywords: Keywords::default(),
        collected_date: local_date(now, state.config().collect.timezone),
        news_letter_sent_date: None,
    };

    let items = state.items();
    if !items.insert_if_absent(&new_item).await? {
        return Err(ApiError::Conflict(format!("Post {guid} already exists")));
    }
    let item = items
        .find_by_guid(&guid)
        .await?
        .ok_or(ApiError::InternalError)?;

    info!(guid = %guid, images = uploaded.uploaded.len(), "Created blog post");
    Ok(success(PostResponse {
        item,
        uploaded_images: uploaded.uploaded,
    }))
}

#[derive(Debug, Serialize)]
struct ItemResponse {
    item: RssItem,
}

#[instrument(skip_all, fields(guid = %guid))]
async fn get_item<S: AppState>(
    State(state): State<S>,
    Path(guid): Path<String>,
) -> Result<Json<Success<ItemResponse>>, ApiError> {
    let mut item = state
        .items()
        .find_by_guid(&guid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {guid}")))?;

    if !state.config().storage_emulated {
        if let Some(content) = item.content.take() {
            item.content = Some(resolve_legacy_image_urls(&state.store(), &content).await?);
        }
    }

    Ok(success(ItemResponse { item }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateItemRequest {
    title: Option<String>,
    content: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    author: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        rename = "news_letter_sent_date"
    )]
    news_letter_sent_date: Option<Option<NaiveDate>>,
}

#[instrument(skip_all, fields(guid = %guid))]
async fn update_item<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Path(guid): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<Success<PostResponse>>, ApiError> {
    let now = Utc::now();
    let mut changes = RssItemChanges {
        title: payload
            .title
            .map(|title| require("title", &title))
            .transpose()?,
        description: payload.description.map(optional),
        author: payload.author.map(optional),
        pub_date: payload.pub_date.map(|date| date.map(|d| d.naive_utc())),
        news_letter_sent_date: payload.news_letter_sent_date,
        ..Default::default()
    };

    if changes.is_empty() && payload.content.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let items = state.items();
    if items.find_by_guid(&guid).await?.is_none() {
        return Err(ApiError::NotFound(format!("Item {guid}")));
    }

    let mut uploaded_images = Vec::new();
    if let Some(content) = payload.content {
        let uploaded = upload_inline_images(&state.store(), &content, now).await?;
        uploaded_images = uploaded.uploaded;
        changes.content = Some(Some(uploaded.content));
    }
    changes.updated_at = Some(now.naive_utc());

    let item = items
        .update(&guid, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {guid}")))?;

    info!(guid = %guid, images = uploaded_images.len(), "Updated item");
    Ok(success(PostResponse {
        item,
        uploaded_images,
    }))
}

pub fn router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/blog", get(list_items::<S>))
        .route("/blog/create", post(create_post::<S>))
        .route("/blog/{guid}", get(get_item::<S>).put(update_item::<S>))
}
