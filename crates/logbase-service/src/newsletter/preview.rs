use std::time::Duration;

use reqwest::{Client, redirect};
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::debug;

use crate::errors::ApiError;
use crate::validation::validate_url;

const PREVIEW_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REDIRECTS: usize = 5;

/// Open Graph metadata of a linked page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkPreview {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Reads `og:title`/`og:description`/`og:image`, falling back to `<title>`
/// and the plain description meta tag.
pub fn extract_preview(html: &str, url: &str) -> LinkPreview {
    let document = Html::parse_document(html);

    let title = meta_content(&document, r#"meta[property="og:title"]"#)
        .or_else(|| document_title(&document));
    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#));
    let image = meta_content(&document, r#"meta[property="og:image"]"#).map(|image| {
        url::Url::parse(url)
            .and_then(|base| base.join(&image))
            .map(|resolved| resolved.to_string())
            .unwrap_or(image)
    });

    LinkPreview {
        url: url.to_string(),
        title,
        description,
        image,
    }
}

/// Follows a redirect only when the next hop would pass [`validate_url`].
fn redirect_policy() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match validate_url(attempt.url().as_str()) {
            Ok(_) => attempt.follow(),
            Err(err) => attempt.error(err),
        }
    })
}

#[derive(Clone)]
pub struct PreviewFetcher {
    client: Client,
}

impl PreviewFetcher {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(redirect_policy())
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<LinkPreview, ApiError> {
        let url = validate_url(url)?;

        let response = self
            .client
            .get(url.clone())
            .timeout(PREVIEW_TIMEOUT)
            .send()
            .await
            .map_err(|err| ApiError::Upstream(format!("Could not fetch {url}: {err}")))?;
        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "Could not fetch {url}: HTTP {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|err| ApiError::Upstream(format!("Could not read {url}: {err}")))?;
        let preview = extract_preview(&html, url.as_str());
        debug!(url = %url, has_title = preview.title.is_some(), "Fetched link preview");
        Ok(preview)
    }
}
