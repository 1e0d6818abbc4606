use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::AppState;
use crate::errors::ApiError;
use crate::keywords::{add_keyword, load_keywords, remove_keyword, rename_keyword};
use crate::routes::{AdminAuth, Success, success};

#[derive(Debug, Serialize)]
struct KeywordsResponse {
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KeywordRequest {
    #[serde(default)]
    keyword: String,
}

#[derive(Debug, Deserialize)]
struct RenameKeywordRequest {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

type KeywordsResult = Result<Json<Success<KeywordsResponse>>, ApiError>;

async fn list<S: AppState>(State(state): State<S>) -> KeywordsResult {
    let keywords = load_keywords(&state.store()).await?;
    Ok(success(KeywordsResponse { keywords }))
}

#[instrument(skip_all, fields(keyword = %payload.keyword))]
async fn add<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Json(payload): Json<KeywordRequest>,
) -> KeywordsResult {
    let keywords = add_keyword(&state.store(), &payload.keyword).await?;
    Ok(success(KeywordsResponse { keywords }))
}

#[instrument(skip_all, fields(from = %payload.from, to = %payload.to))]
async fn rename<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Json(payload): Json<RenameKeywordRequest>,
) -> KeywordsResult {
    let keywords = rename_keyword(&state.store(), &payload.from, &payload.to).await?;
    Ok(success(KeywordsResponse { keywords }))
}

#[instrument(skip_all, fields(keyword = %payload.keyword))]
async fn remove<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Json(payload): Json<KeywordRequest>,
) -> KeywordsResult {
    let keywords = remove_keyword(&state.store(), &payload.keyword).await?;
    Ok(success(KeywordsResponse { keywords }))
}

pub fn router<S: AppState>() -> Router<S> {
    Router::new().route(
        "/keywords",
        get(list::<S>)
            .post(add::<S>)
            .put(rename::<S>)
            .delete(remove::<S>),
    )
}
