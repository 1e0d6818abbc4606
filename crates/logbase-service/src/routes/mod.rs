use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use crate::AppState;
use crate::errors::ApiError;
use crate::storage::{ObjectStore, content_type_for};

pub mod api;
mod auth;

pub use auth::AdminAuth;

/// A successful response: the payload's fields next to `"success": true`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    success: bool,
    #[serde(flatten)]
    data: T,
}

pub fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

/// Deserializes a field that distinguishes absent (`None`) from an explicit
/// `null` (`Some(None)`). Pair with `#[serde(default)]`.
pub(crate) fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip_all, fields(path = %path))]
async fn serve_object<S: AppState>(
    State(state): State<S>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.store().get(&path).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes))
}

pub fn create_router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/health", get(health))
        .route("/storage/{*path}", get(serve_object::<S>))
        .nest("/api", api::create_api_router())
}
