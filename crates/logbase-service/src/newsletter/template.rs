use std::sync::LazyLock;

use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::{Captures, Regex};

use super::preview::LinkPreview;
use crate::models::RssItem;

/// Template used when storage has no `newsletters/template.html`.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/newsletter.html");

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Values substituted into a newsletter template. `content`, `preview` and
/// `items` are HTML; `title` and `sent_date` are escaped.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub title: &'a str,
    pub sent_date: &'a str,
    pub content: &'a str,
    pub preview: &'a str,
    pub items: &'a str,
}

/// Fills `{{title}}`, `{{sent_date}}`, `{{content}}`, `{{preview}}` and
/// `{{items}}` in one pass. Unknown placeholders are removed; substituted
/// values are not scanned again.
pub fn render_template(template: &str, vars: &TemplateVars<'_>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "title" => encode_text(vars.title).into_owned(),
            "sent_date" => encode_text(vars.sent_date).into_owned(),
            "content" => vars.content.to_string(),
            "preview" => vars.preview.to_string(),
            "items" => vars.items.to_string(),
            _ => String::new(),
        })
        .into_owned()
}

/// The fixed item list: linked title, source blog and optional description.
pub fn render_items(items: &[RssItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut html = String::from("<ul style=\"padding-left:20px;margin:0;\">\n");
    for item in items {
        html.push_str(&format!(
            "<li style=\"margin-bottom:12px;\"><a href=\"{}\" style=\"color:#1d4ed8;font-weight:600;\">{}</a> <span style=\"color:#6b7280;font-size:13px;\">{}</span>",
            encode_double_quoted_attribute(&item.link),
            encode_text(&item.title),
            encode_text(&item.blog_name),
        ));
        if let Some(description) = item.description.as_deref().map(str::trim) {
            if !description.is_empty() {
                html.push_str(&format!(
                    "<br><span style=\"font-size:14px;\">{}</span>",
                    encode_text(&truncate(&strip_tags(description), 200))
                ));
            }
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ul>");
    html
}

/// A link card for the scraped preview of the featured URL.
pub fn render_preview(preview: &LinkPreview) -> String {
    let mut html = format!(
        "<a href=\"{}\" style=\"display:block;border:1px solid #e5e7eb;border-radius:8px;padding:16px;text-decoration:none;color:#111;\">",
        encode_double_quoted_attribute(&preview.url)
    );
    if let Some(image) = &preview.image {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"\" style=\"width:100%;border-radius:4px;margin-bottom:12px;\">",
            encode_double_quoted_attribute(image)
        ));
    }
    if let Some(title) = &preview.title {
        html.push_str(&format!("<strong>{}</strong>", encode_text(title)));
    }
    if let Some(description) = &preview.description {
        html.push_str(&format!(
            "<p style=\"margin:8px 0 0;color:#4b5563;font-size:14px;\">{}</p>",
            encode_text(description)
        ));
    }
    html.push_str("</a>");
    html
}

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").trim().to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}
