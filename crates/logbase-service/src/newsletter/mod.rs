//! Newsletter composition and delivery.
//!
//! Composing renders the HTML template with the featured link preview and the
//! items scheduled for the send date, stores the result under `newsletters/`
//! and records it in the index. Sending pushes recipients and the stored HTML
//! to MailerLite and schedules an instant campaign.

mod index;
mod mailerlite;
mod preview;
mod template;

pub use index::NewsletterIndex;
pub use mailerlite::{CampaignDraft, MailerLiteClient, MailerLiteError, Recipient};
pub use preview::{LinkPreview, PreviewFetcher, extract_preview};
pub use template::{DEFAULT_TEMPLATE, TemplateVars, render_items, render_preview, render_template};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::ApiError;
use crate::models::{NewsletterRecord, RecipientSnapshot};
use crate::repositories::{ItemRepository, SubscriberRepository};
use crate::storage::{NEWSLETTER_DIR, NEWSLETTER_TEMPLATE_PATH, ObjectStore, StorageError};
use crate::AppState;

/// Name of the MailerLite template every campaign is sent from.
pub const MAILERLITE_TEMPLATE_NAME: &str = "Logbase Newsletter";

#[derive(Debug, Clone)]
pub struct NewsletterDraft {
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub sent_date: NaiveDate,
}

/// Fields to change on an existing newsletter. `url: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct NewsletterPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<Option<String>>,
    pub sent_date: Option<NaiveDate>,
}

pub fn newsletter_filename(sent_date: NaiveDate, now: DateTime<Utc>) -> String {
    format!("newsletter-{sent_date}-{}.html", now.timestamp_millis())
}

pub struct NewsletterComposer<I, S> {
    items: I,
    store: S,
    previews: PreviewFetcher,
    index: NewsletterIndex<S>,
}

impl<I: ItemRepository, S: ObjectStore> NewsletterComposer<I, S> {
    pub fn new(items: I, store: S, previews: PreviewFetcher) -> Self {
        let index = NewsletterIndex::new(store.clone());
        Self {
            items,
            store,
            previews,
            index,
        }
    }

    /// The stored template, or the built-in one when none was uploaded.
    async fn template(&self) -> Result<String, ApiError> {
        match self.store.get(NEWSLETTER_TEMPLATE_PATH).await {
            Ok(bytes) => String::from_utf8(bytes).map_err(|_| {
                ApiError::BadRequest(format!("{NEWSLETTER_TEMPLATE_PATH} is not valid UTF-8"))
            }),
            Err(StorageError::NotFound(_)) => Ok(DEFAULT_TEMPLATE.to_string()),
            Err(err) => Err(err.into()),
        }
    }

    async fn render(
        &self,
        title: &str,
        content: &str,
        url: Option<&str>,
        sent_date: NaiveDate,
    ) -> Result<String, ApiError> {
        let template = self.template().await?;

        // The preview card is decoration; a dead link must not block the issue.
        let preview = match url {
            Some(url) => match self.previews.fetch(url).await {
                Ok(preview) => render_preview(&preview),
                Err(err) => {
                    warn!(url = %url, error = %err, "Link preview unavailable, composing without it");
                    String::new()
                }
            },
            None => String::new(),
        };

        let items = self.items.find_by_newsletter_date(sent_date).await?;
        let items_html = render_items(&items);

        let sent_date = sent_date.to_string();
        Ok(render_template(
            &template,
            &TemplateVars {
                title,
                sent_date: &sent_date,
                content,
                preview: &preview,
                items: &items_html,
            },
        ))
    }

    pub async fn compose(
        &self,
        draft: NewsletterDraft,
        now: DateTime<Utc>,
    ) -> Result<NewsletterRecord, ApiError> {
        let html = self
            .render(
                &draft.title,
                &draft.content,
                draft.url.as_deref(),
                draft.sent_date,
            )
            .await?;

        let filename = newsletter_filename(draft.sent_date, now);
        let html_file_path = format!("{NEWSLETTER_DIR}/{filename}");
        self.store.put(&html_file_path, html.into_bytes()).await?;

        let record = NewsletterRecord {
            filename,
            title: draft.title,
            content: draft.content,
            url: draft.url,
            sent_date: draft.sent_date,
            html_file_path,
            recipients: Vec::new(),
            created_at: now,
            updated_at: None,
            sent_at: None,
            campaign_id: None,
        };
        self.index.append(record.clone()).await?;

        info!(filename = %record.filename, sent_date = %record.sent_date, "Composed newsletter");
        Ok(record)
    }

    /// Re-renders an existing newsletter in place after applying `patch`.
    pub async fn recompose(
        &self,
        filename: &str,
        patch: NewsletterPatch,
        now: DateTime<Utc>,
    ) -> Result<NewsletterRecord, ApiError> {
        let mut record = self.index.find(filename).await?;
        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(content) = patch.content {
            record.content = content;
        }
        if let Some(url) = patch.url {
            record.url = url;
        }
        if let Some(sent_date) = patch.sent_date {
            record.sent_date = sent_date;
        }

        let html = self
            .render(
                &record.title,
                &record.content,
                record.url.as_deref(),
                record.sent_date,
            )
            .await?;
        self.store
            .put(&record.html_file_path, html.into_bytes())
            .await?;

        let updated = self
            .index
            .update(filename, |stored| {
                stored.title = record.title;
                stored.content = record.content;
                stored.url = record.url;
                stored.sent_date = record.sent_date;
                stored.updated_at = Some(now);
            })
            .await?;

        info!(filename = %filename, "Recomposed newsletter");
        Ok(updated)
    }
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub filename: String,
    pub subject: Option<String>,
    /// Explicit recipients; active subscribers are used when empty.
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReport {
    pub campaign_id: String,
    pub synced: usize,
    pub failed: Vec<String>,
    pub test_mode: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TestMode {
    pub enabled: bool,
    pub recipients: Vec<String>,
}

pub struct NewsletterSender<U, S> {
    subscribers: U,
    store: S,
    index: NewsletterIndex<S>,
    mailerlite: MailerLiteClient,
    test_mode: TestMode,
}

impl<U: SubscriberRepository, S: ObjectStore> NewsletterSender<U, S> {
    pub fn new(subscribers: U, store: S, mailerlite: MailerLiteClient, test_mode: TestMode) -> Self {
        let index = NewsletterIndex::new(store.clone());
        Self {
            subscribers,
            store,
            index,
            mailerlite,
            test_mode,
        }
    }

    async fn recipients(&self, requested: Vec<Recipient>) -> Result<Vec<Recipient>, ApiError> {
        if self.test_mode.enabled {
            if self.test_mode.recipients.is_empty() {
                return Err(ApiError::NotConfigured("NEWSLETTER_TEST_RECIPIENTS"));
            }
            info!(
                recipients = self.test_mode.recipients.len(),
                "Test mode: sending to test recipients only"
            );
            return Ok(self
                .test_mode
                .recipients
                .iter()
                .map(|email| Recipient {
                    email: email.clone(),
                    name: None,
                    company: None,
                })
                .collect());
        }

        if !requested.is_empty() {
            return Ok(requested);
        }

        Ok(self
            .subscribers
            .list_active()
            .await?
            .into_iter()
            .map(|subscriber| Recipient {
                email: subscriber.email,
                name: Some(subscriber.name),
                company: subscriber.company,
            })
            .collect())
    }

    pub async fn send(&self, request: SendRequest, now: DateTime<Utc>) -> Result<SendReport, ApiError> {
        let record = self.index.find(&request.filename).await?;
        let html = String::from_utf8(self.store.get(&record.html_file_path).await?)
            .map_err(|_| ApiError::BadRequest(format!("{} is not valid UTF-8", record.html_file_path)))?;

        let recipients = self.recipients(request.recipients).await?;
        if recipients.is_empty() {
            return Err(ApiError::BadRequest("No recipients to send to".to_string()));
        }

        let mut synced = Vec::with_capacity(recipients.len());
        let mut failed = Vec::new();
        for recipient in recipients {
            match self.mailerlite.upsert_subscriber(&recipient).await {
                Ok(()) => synced.push(recipient),
                Err(err) => {
                    warn!(email = %recipient.email, error = %err, "Failed to sync recipient, skipping");
                    failed.push(recipient.email);
                }
            }
        }
        if synced.is_empty() {
            return Err(ApiError::Upstream(
                "No recipient could be synced to MailerLite".to_string(),
            ));
        }

        let template_id = self
            .mailerlite
            .find_or_create_template(MAILERLITE_TEMPLATE_NAME, &html)
            .await?;
        let subject = request.subject.unwrap_or_else(|| record.title.clone());
        let campaign_name = format!("{} ({})", record.title, record.sent_date);
        let campaign_id = self
            .mailerlite
            .create_campaign(&CampaignDraft {
                name: &campaign_name,
                subject: &subject,
                template_id: &template_id,
            })
            .await?;
        self.mailerlite.schedule_instant(&campaign_id).await?;

        let snapshot: Vec<RecipientSnapshot> = synced
            .iter()
            .map(|recipient| RecipientSnapshot {
                email: recipient.email.clone(),
                name: recipient.name.clone(),
                company: recipient.company.clone(),
            })
            .collect();
        let synced_count = snapshot.len();
        let campaign = campaign_id.clone();
        self.index
            .update(&record.filename, move |stored| {
                stored.recipients = snapshot;
                stored.sent_at = Some(now);
                stored.campaign_id = Some(campaign);
            })
            .await?;

        info!(
            filename = %record.filename,
            campaign_id = %campaign_id,
            synced = synced_count,
            failed = failed.len(),
            "Newsletter sent"
        );
        Ok(SendReport {
            campaign_id,
            synced: synced_count,
            failed,
            test_mode: self.test_mode.enabled,
        })
    }
}

pub fn composer_for<S: AppState>(state: &S) -> NewsletterComposer<S::Items, S::Store> {
    NewsletterComposer::new(state.items(), state.store(), state.previews().clone())
}

/// A sender wired to the application state; fails when MailerLite is not configured.
pub fn sender_for<S: AppState>(state: &S) -> Result<NewsletterSender<S::Subscribers, S::Store>, ApiError> {
    let mailerlite = state
        .mailerlite()
        .cloned()
        .ok_or(ApiError::NotConfigured("MAILERLITE_API_KEY"))?;
    let config = state.config();
    Ok(NewsletterSender::new(
        state.subscribers(),
        state.store(),
        mailerlite,
        TestMode {
            enabled: config.newsletter_test_mode,
            recipients: config.newsletter_test_recipients.clone(),
        },
    ))
}
