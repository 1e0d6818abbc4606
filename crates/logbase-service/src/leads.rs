//! Lead capture: inquiry, newsletter signup and contact forms posted to Slack.

use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::ApiError;
use crate::models::{NewSubscriber, SubscriberStatus};
use crate::repositories::SubscriberRepository;
use crate::validation::{ValidationError, normalize_phone, optional, require, validate_email};

const SLACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum SlackError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// An incoming-webhook payload: fallback text plus Block Kit blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub text: String,
    pub blocks: Vec<Value>,
}

#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
}

impl SlackNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn post(&self, webhook: &str, message: &SlackMessage) -> Result<(), SlackError> {
        let response = self
            .client
            .post(webhook)
            .timeout(SLACK_TIMEOUT)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Status { status, body });
        }
        debug!(text = %message.text, "Posted Slack message");
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InquiryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub company: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inquiry {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub message: String,
}

impl TryFrom<InquiryRequest> for Inquiry {
    type Error = ValidationError;

    fn try_from(request: InquiryRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: require("name", &request.name)?,
            email: validate_email(&require("email", &request.email)?)?,
            phone: normalize_phone(&require("phone", &request.phone)?)?,
            company: optional(request.company),
            message: require("message", &request.message)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

impl TryFrom<SignupRequest> for Signup {
    type Error = ValidationError;

    fn try_from(request: SignupRequest) -> Result<Self, Self::Error> {
        let phone = optional(request.phone)
            .map(|phone| normalize_phone(&phone))
            .transpose()?;
        Ok(Self {
            name: require("name", &request.name)?,
            email: validate_email(&require("email", &request.email)?)?,
            company: optional(request.company),
            phone,
        })
    }
}

impl Signup {
    fn subscriber(&self) -> NewSubscriber {
        NewSubscriber {
            email: self.email.clone(),
            name: self.name.clone(),
            company: self.company.clone(),
            phone: self.phone.clone(),
            status: SubscriberStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

impl TryFrom<ContactRequest> for Contact {
    type Error = ValidationError;

    fn try_from(request: ContactRequest) -> Result<Self, Self::Error> {
        let phone = optional(request.phone)
            .map(|phone| normalize_phone(&phone))
            .transpose()?;
        Ok(Self {
            name: require("name", &request.name)?,
            email: validate_email(&require("email", &request.email)?)?,
            phone,
            company: optional(request.company),
            subject: optional(request.subject),
            message: require("message", &request.message)?,
        })
    }
}

fn header(text: &str) -> Value {
    json!({
        "type": "header",
        "text": { "type": "plain_text", "text": text, "emoji": true }
    })
}

fn fields(pairs: &[(&str, &str)]) -> Value {
    let fields: Vec<Value> = pairs
        .iter()
        .map(|(label, value)| json!({ "type": "mrkdwn", "text": format!("*{label}:*\n{value}") }))
        .collect();
    json!({ "type": "section", "fields": fields })
}

fn quoted(label: &str, text: &str) -> Value {
    let quoted: Vec<String> = text.lines().map(|line| format!(">{line}")).collect();
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": format!("*{label}:*\n{}", quoted.join("\n")) }
    })
}

fn received_at(now: DateTime<Utc>, tz: Tz) -> Value {
    let local = now.with_timezone(&tz);
    json!({
        "type": "context",
        "elements": [{
            "type": "mrkdwn",
            "text": format!("Received {}", local.format("%Y-%m-%d %H:%M:%S %Z"))
        }]
    })
}

const NOT_PROVIDED: &str = "-";

pub fn inquiry_blocks(inquiry: &Inquiry, now: DateTime<Utc>, tz: Tz) -> SlackMessage {
    let company = inquiry.company.as_deref().unwrap_or(NOT_PROVIDED);
    SlackMessage {
        text: format!("New inquiry from {} ({})", inquiry.name, inquiry.email),
        blocks: vec![
            header("📩 New inquiry"),
            fields(&[
                ("Name", inquiry.name.as_str()),
                ("Company", company),
                ("Email", inquiry.email.as_str()),
                ("Phone", inquiry.phone.as_str()),
            ]),
            quoted("Message", &inquiry.message),
            json!({ "type": "divider" }),
            received_at(now, tz),
        ],
    }
}

pub fn newsletter_signup_blocks(signup: &Signup, now: DateTime<Utc>, tz: Tz) -> SlackMessage {
    SlackMessage {
        text: format!("New newsletter subscriber: {}", signup.email),
        blocks: vec![
            header("📰 New newsletter subscriber"),
            fields(&[
                ("Name", signup.name.as_str()),
                ("Email", signup.email.as_str()),
                ("Company", signup.company.as_deref().unwrap_or(NOT_PROVIDED)),
                ("Phone", signup.phone.as_deref().unwrap_or(NOT_PROVIDED)),
            ]),
            received_at(now, tz),
        ],
    }
}

pub fn contact_blocks(contact: &Contact, now: DateTime<Utc>, tz: Tz) -> SlackMessage {
    let subject = contact.subject.as_deref().unwrap_or("Contact request");
    SlackMessage {
        text: format!("{subject} from {} ({})", contact.name, contact.email),
        blocks: vec![
            header(&format!("✉️ {subject}")),
            fields(&[
                ("Name", contact.name.as_str()),
                ("Company", contact.company.as_deref().unwrap_or(NOT_PROVIDED)),
                ("Email", contact.email.as_str()),
                ("Phone", contact.phone.as_deref().unwrap_or(NOT_PROVIDED)),
            ]),
            quoted("Message", &contact.message),
            received_at(now, tz),
        ],
    }
}

/// How a newsletter signup was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupOutcome {
    pub notified: bool,
    pub saved: bool,
}

/// Notifies Slack and stores the subscriber. Succeeds when either step does.
pub async fn register_signup<U: SubscriberRepository>(
    notifier: &SlackNotifier,
    webhook: Option<&str>,
    subscribers: &U,
    signup: &Signup,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<SignupOutcome, ApiError> {
    let notified = match webhook {
        Some(webhook) => {
            match notifier
                .post(webhook, &newsletter_signup_blocks(signup, now, tz))
                .await
            {
                Ok(()) => true,
                Err(err) => {
                    warn!(email = %signup.email, error = %err, "Slack notification for signup failed");
                    false
                }
            }
        }
        None => {
            warn!("SLACK_WEBHOOK_NEWSLETTER is not set, skipping signup notification");
            false
        }
    };

    let saved = match subscribers.upsert_by_email(&signup.subscriber()).await {
        Ok(_) => true,
        Err(err) => {
            warn!(email = %signup.email, error = %err, "Failed to store newsletter subscriber");
            false
        }
    };

    if !notified && !saved {
        return Err(ApiError::Upstream(
            "Newsletter signup could not be recorded".to_string(),
        ));
    }
    info!(email = %signup.email, notified, saved, "Newsletter signup recorded");
    Ok(SignupOutcome { notified, saved })
}
