//! The keyword vocabulary used to filter and annotate collected items,
//! stored as a JSON array in `keywords/keywords.json`.

use tracing::info;

use crate::errors::ApiError;
use crate::storage::{self, KEYWORDS_PATH, ObjectStore};
use crate::validation::require;

pub async fn load_keywords<S: ObjectStore>(store: &S) -> Result<Vec<String>, ApiError> {
    Ok(storage::get_json::<Vec<String>, _>(store, KEYWORDS_PATH)
        .await?
        .unwrap_or_default())
}

async fn save_keywords<S: ObjectStore>(store: &S, keywords: &[String]) -> Result<(), ApiError> {
    storage::put_json(store, KEYWORDS_PATH, keywords).await?;
    Ok(())
}

fn position(keywords: &[String], keyword: &str) -> Option<usize> {
    let needle = keyword.to_lowercase();
    keywords.iter().position(|k| k.to_lowercase() == needle)
}

pub async fn add_keyword<S: ObjectStore>(store: &S, keyword: &str) -> Result<Vec<String>, ApiError> {
    let keyword = require("keyword", keyword)?;
    let mut keywords = load_keywords(store).await?;
    if position(&keywords, &keyword).is_some() {
        return Err(ApiError::Conflict(format!("Keyword already exists: {keyword}")));
    }

    keywords.push(keyword.clone());
    save_keywords(store, &keywords).await?;
    info!(keyword = %keyword, "Added keyword");
    Ok(keywords)
}

pub async fn rename_keyword<S: ObjectStore>(
    store: &S,
    from: &str,
    to: &str,
) -> Result<Vec<String>, ApiError> {
    let from = require("from", from)?;
    let to = require("to", to)?;
    let mut keywords = load_keywords(store).await?;

    let index = position(&keywords, &from)
        .ok_or_else(|| ApiError::NotFound(format!("Keyword {from}")))?;
    if let Some(existing) = position(&keywords, &to) {
        if existing != index {
            return Err(ApiError::Conflict(format!("Keyword already exists: {to}")));
        }
    }

    keywords[index] = to.clone();
    save_keywords(store, &keywords).await?;
    info!(from = %from, to = %to, "Renamed keyword");
    Ok(keywords)
}

pub async fn remove_keyword<S: ObjectStore>(
    store: &S,
    keyword: &str,
) -> Result<Vec<String>, ApiError> {
    let keyword = require("keyword", keyword)?;
    let mut keywords = load_keywords(store).await?;
    let index = position(&keywords, &keyword)
        .ok_or_else(|| ApiError::NotFound(format!("Keyword {keyword}")))?;

    keywords.remove(index);
    save_keywords(store, &keywords).await?;
    info!(keyword = %keyword, "Removed keyword");
    Ok(keywords)
}
