//! Authored posts: inline image upload and image URL rewriting.
//!
//! The editor sends markdown with images embedded as base64 data URIs. Those
//! are moved to object storage and replaced with public URLs. Older posts
//! may still reference images by emulator URL, by the previous public
//! storage URL or by bare filename; those are rewritten on read once the
//! file is found in storage.

use std::ops::Range;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::ApiError;
use crate::storage::{BLOG_IMAGE_DIR, ObjectStore, StorageError};
use crate::validation::ValidationError;

static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:image/(png|jpe?g|gif|webp|svg\+xml);base64,([A-Za-z0-9+/=]+)")
        .expect("data URI pattern is valid")
});

/// Emulator URLs: `http://localhost:9199/v0/b/<bucket>/o/blog-images%2F<file>?alt=media`
static EMULATOR_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"https?://(?:localhost|127\.0\.0\.1):9199/v0/b/[^/\s]+/o/blog-images%2F([^?\s)"'<>]+)(?:\?[^\s)"'<>]*)?"#,
    )
    .expect("emulator URL pattern is valid")
});

/// Previous public URLs, both the download-token and the bucket form.
static LEGACY_PUBLIC_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"https://(?:firebasestorage\.googleapis\.com/v0/b/[^/\s]+/o/blog-images%2F|storage\.googleapis\.com/[^/\s]+/blog-images/)([^?\s)"'<>]+)(?:\?[^\s)"'<>]*)?"#,
    )
    .expect("legacy public URL pattern is valid")
});

/// Markdown image references to a bare filename: `![alt](photo.png)`.
static BARE_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^)/\s:]+\.(?i:png|jpe?g|gif|webp|svg))\)")
        .expect("bare filename pattern is valid")
});

/// An inline image found in post content.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub range: Range<usize>,
    pub extension: &'static str,
    pub payload: String,
}

pub fn extract_inline_images(content: &str) -> Vec<InlineImage> {
    DATA_URI_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let extension = match &caps[1] {
                "png" => "png",
                "jpg" | "jpeg" => "jpg",
                "gif" => "gif",
                "webp" => "webp",
                _ => "svg",
            };
            Some(InlineImage {
                range: whole.range(),
                extension,
                payload: caps[2].to_string(),
            })
        })
        .collect()
}

/// Replaces byte ranges of `content`; ranges must be sorted and disjoint.
fn splice(content: &str, replacements: Vec<(Range<usize>, String)>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for (range, replacement) in replacements {
        out.push_str(&content[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&content[cursor..]);
    out
}

/// Uploaded images and the content rewritten to reference them.
#[derive(Debug, Clone)]
pub struct UploadedContent {
    pub content: String,
    pub uploaded: Vec<String>,
}

/// Moves every base64 inline image into storage and points the content at
/// its public URL.
pub async fn upload_inline_images<S: ObjectStore>(
    store: &S,
    content: &str,
    now: DateTime<Utc>,
) -> Result<UploadedContent, ApiError> {
    let images = extract_inline_images(content);
    if images.is_empty() {
        return Ok(UploadedContent {
            content: content.to_string(),
            uploaded: Vec::new(),
        });
    }

    let timestamp = now.timestamp_millis();
    let mut replacements = Vec::with_capacity(images.len());
    let mut uploaded = Vec::with_capacity(images.len());

    for (index, image) in images.into_iter().enumerate() {
        let bytes = STANDARD
            .decode(image.payload.as_bytes())
            .map_err(|err| ValidationError::InvalidImage(err.to_string()))?;
        let path = format!("{BLOG_IMAGE_DIR}/{timestamp}_{index}.{}", image.extension);

        store.put(&path, bytes).await?;
        debug!(path = %path, "Uploaded inline image");

        replacements.push((image.range, store.public_url(&path)));
        uploaded.push(path);
    }

    Ok(UploadedContent {
        content: splice(content, replacements),
        uploaded,
    })
}

async fn rewrite_if_stored<S: ObjectStore>(
    store: &S,
    content: &str,
    pattern: &Regex,
    file_group: usize,
    render: impl Fn(&str, String) -> String,
) -> Result<String, ApiError> {
    // (matched range, first capture, referenced filename)
    let references: Vec<(Range<usize>, String, String)> = pattern
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let file = caps.get(file_group)?;
            let first = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            Some((whole.range(), first.to_string(), file.as_str().to_string()))
        })
        .collect();

    let mut replacements = Vec::new();
    for (range, first, file) in references {
        let Ok(file) = urlencoding::decode(&file) else {
            warn!(file = %file, "Blog image reference is not valid UTF-8 once decoded");
            continue;
        };
        let path = format!("{BLOG_IMAGE_DIR}/{file}");
        match store.exists(&path).await {
            Ok(true) => replacements.push((range, render(&first, store.public_url(&path)))),
            Ok(false) => warn!(path = %path, "Referenced blog image not found in storage"),
            Err(StorageError::InvalidPath(_)) => {
                warn!(path = %path, "Ignoring blog image reference outside the image folder");
            }
            Err(err) => return Err(err.into()),
        }
    }

    if replacements.is_empty() {
        Ok(content.to_string())
    } else {
        Ok(splice(content, replacements))
    }
}

/// Rewrites historical image references to the canonical public URL when
/// the image exists in storage. References to missing files are left as-is.
pub async fn resolve_legacy_image_urls<S: ObjectStore>(
    store: &S,
    content: &str,
) -> Result<String, ApiError> {
    let content = rewrite_if_stored(store, content, &EMULATOR_URL_RE, 1, |_, url| url).await?;
    let content =
        rewrite_if_stored(store, &content, &LEGACY_PUBLIC_URL_RE, 1, |_, url| url).await?;
    rewrite_if_stored(store, &content, &BARE_FILENAME_RE, 2, |alt, url| {
        format!("![{alt}]({url})")
    })
    .await
}

/// Storage paths of the blog images a post references through `public_base`.
pub fn image_paths_in(content: &str, public_base: &str) -> Vec<String> {
    let pattern = format!(
        r#"{}/({}/[^?\s)"'<>]+)"#,
        regex::escape(public_base.trim_end_matches('/')),
        BLOG_IMAGE_DIR
    );
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut paths: Vec<String> = re
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect();
    paths.sort();
    paths.dedup();
    paths
}
