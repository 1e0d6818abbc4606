//! Minimal MailerLite REST client: subscribers, templates and campaigns.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::MailerLiteConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum MailerLiteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },
}

/// A subscriber as pushed to MailerLite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CampaignDraft<'a> {
    pub name: &'a str,
    pub subject: &'a str,
    pub template_id: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct Identified {
    #[serde(deserialize_with = "id_as_string")]
    id: String,
}

#[derive(Deserialize)]
struct NamedTemplate {
    #[serde(deserialize_with = "id_as_string")]
    id: String,
    name: String,
}

/// MailerLite ids are numeric strings in some responses and numbers in others.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

#[derive(Clone)]
pub struct MailerLiteClient {
    client: Client,
    base_url: String,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl MailerLiteClient {
    /// `None` when no API key is configured.
    pub fn from_config(client: Client, config: &MailerLiteConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
    }

    async fn send<T: DeserializeOwned>(
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, MailerLiteError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerLiteError::Status {
                operation,
                status,
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Creates the subscriber, updating it instead when it already exists.
    pub async fn upsert_subscriber(&self, recipient: &Recipient) -> Result<(), MailerLiteError> {
        let fields = json!({
            "name": recipient.name,
            "company": recipient.company,
        });

        let response = self
            .request(reqwest::Method::POST, "/subscribers")
            .json(&json!({ "email": recipient.email, "fields": fields }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!(email = %recipient.email, "Created MailerLite subscriber");
                Ok(())
            }
            StatusCode::CONFLICT => {
                let request = self
                    .request(
                        reqwest::Method::PUT,
                        &format!("/subscribers/{}", recipient.email),
                    )
                    .json(&json!({ "fields": fields }));
                Self::send::<serde_json::Value>("update subscriber", request).await?;
                debug!(email = %recipient.email, "Updated existing MailerLite subscriber");
                Ok(())
            }
            status => Err(MailerLiteError::Status {
                operation: "create subscriber",
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Returns the id of the template called `name`, refreshing its HTML, or
    /// creates it.
    pub async fn find_or_create_template(
        &self,
        name: &str,
        html: &str,
    ) -> Result<String, MailerLiteError> {
        let request = self
            .request(reqwest::Method::GET, "/templates")
            .query(&[("filter[name]", name)]);
        let existing: Envelope<Vec<NamedTemplate>> = Self::send("list templates", request).await?;

        if let Some(template) = existing.data.into_iter().find(|t| t.name == name) {
            let request = self
                .request(reqwest::Method::PUT, &format!("/templates/{}", template.id))
                .json(&json!({ "html": html }));
            Self::send::<serde_json::Value>("update template", request).await?;
            debug!(template_id = %template.id, "Reusing MailerLite template");
            return Ok(template.id);
        }

        let request = self
            .request(reqwest::Method::POST, "/templates")
            .json(&json!({ "name": name, "html": html }));
        let created: Envelope<Identified> = Self::send("create template", request).await?;
        info!(template_id = %created.data.id, "Created MailerLite template");
        Ok(created.data.id)
    }

    /// Creates a regular campaign from a template; the template carries the
    /// `{$name}` personalization tags.
    pub async fn create_campaign(
        &self,
        draft: &CampaignDraft<'_>,
    ) -> Result<String, MailerLiteError> {
        let request = self
            .request(reqwest::Method::POST, "/campaigns")
            .json(&json!({
                "name": draft.name,
                "type": "regular",
                "emails": [{
                    "subject": draft.subject,
                    "from_name": self.from_name,
                    "from": self.from_email,
                    "template_id": draft.template_id,
                }],
            }));
        let created: Envelope<Identified> = Self::send("create campaign", request).await?;
        info!(campaign_id = %created.data.id, name = %draft.name, "Created MailerLite campaign");
        Ok(created.data.id)
    }

    pub async fn schedule_instant(&self, campaign_id: &str) -> Result<(), MailerLiteError> {
        let request = self
            .request(
                reqwest::Method::POST,
                &format!("/campaigns/{campaign_id}/schedule"),
            )
            .json(&json!({ "delivery": "instant" }));
        Self::send::<serde_json::Value>("schedule campaign", request).await?;
        info!(campaign_id = %campaign_id, "Scheduled MailerLite campaign for instant delivery");
        Ok(())
    }
}
