//! Object storage for generated newsletters, uploaded images and the JSON
//! files (feed list, keyword list, newsletter index) the service keeps there.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

pub const FEEDS_PATH: &str = "feeds/feeds.json";
pub const KEYWORDS_PATH: &str = "keywords/keywords.json";
pub const NEWSLETTER_INDEX_PATH: &str = "newsletters/newsletters.json";
pub const NEWSLETTER_TEMPLATE_PATH: &str = "newsletters/template.html";
pub const NEWSLETTER_DIR: &str = "newsletters";
pub const BLOG_IMAGE_DIR: &str = "blog-images";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait ObjectStore: Clone + Send + Sync + 'static {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
    /// Object paths directly under `dir`, sorted.
    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError>;
    fn public_url(&self, path: &str) -> String;
}

/// Reads and decodes a JSON object; `None` when it does not exist yet.
pub async fn get_json<T, S>(store: &S, path: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: ObjectStore,
{
    let bytes = match store.get(path).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => return Ok(None),
        Err(err) => return Err(err),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StorageError::Json {
            path: path.to_string(),
            source,
        })
}

pub async fn put_json<T, S>(store: &S, path: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: ObjectStore,
{
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
        path: path.to_string(),
        source,
    })?;
    store.put(path, bytes).await
}

/// Stores objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &str, source: std::io::Error) -> StorageError {
    if source.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io {
            path: path.to_string(),
            source,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve(path)?;
        tokio::fs::read(&file)
            .await
            .map_err(|err| io_error(path, err))
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| io_error(path, err))?;
        }
        debug!(path = %path, size = bytes.len(), "Writing object");
        tokio::fs::write(&file, bytes)
            .await
            .map_err(|err| io_error(path, err))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let file = self.resolve(path)?;
        tokio::fs::try_exists(&file)
            .await
            .map_err(|err| io_error(path, err))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let file = self.resolve(path)?;
        debug!(path = %path, "Deleting object");
        tokio::fs::remove_file(&file)
            .await
            .map_err(|err| io_error(path, err))
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        let dir = dir.trim_end_matches('/');
        let folder = self.resolve(dir)?;
        let mut entries = match tokio::fs::read_dir(&folder).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(dir, err)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|err| io_error(dir, err))? {
            let is_file = entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            if is_file {
                paths.push(format!("{dir}/{}", entry.file_name().to_string_lossy()));
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path.trim_start_matches('/'))
    }
}

/// Content type for serving an object, from its extension.
pub fn content_type_for(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
