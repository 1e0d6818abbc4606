use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::AppState;
use crate::errors::ApiError;
use crate::models::NewsletterRecord;
use crate::newsletter::{
    NewsletterDraft, NewsletterIndex, NewsletterPatch, Recipient, SendReport, SendRequest,
    composer_for, sender_for,
};
use crate::routes::{AdminAuth, Success, explicit_null, success};
use crate::storage::ObjectStore;
use crate::validation::{optional, parse_date, require, validate_email};

#[derive(Debug, Serialize)]
struct NewslettersResponse {
    newsletters: Vec<NewsletterRecord>,
}

async fn list<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
) -> Result<Json<Success<NewslettersResponse>>, ApiError> {
    let newsletters = NewsletterIndex::new(state.store()).load().await?;
    Ok(success(NewslettersResponse { newsletters }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    url: Option<String>,
    #[serde(default)]
    sent_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewsletterResponse {
    newsletter: NewsletterRecord,
    public_url: String,
}

#[instrument(skip_all, fields(title = %payload.title, sent_date = %payload.sent_date))]
async fn create<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Json(payload): Json<CreateRequest>,
) -> Result<Json<Success<NewsletterResponse>>, ApiError> {
    let draft = NewsletterDraft {
        title: require("title", &payload.title)?,
        content: require("content", &payload.content)?,
        url: optional(payload.url),
        sent_date: parse_date(&require("sentDate", &payload.sent_date)?)?,
    };

    let newsletter = composer_for(&state).compose(draft, Utc::now()).await?;
    let public_url = state.store().public_url(&newsletter.html_file_path);
    Ok(success(NewsletterResponse {
        newsletter,
        public_url,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    #[serde(default)]
    filename: String,
    title: Option<String>,
    content: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    url: Option<Option<String>>,
    sent_date: Option<String>,
}

#[instrument(skip_all, fields(filename = %payload.filename))]
async fn update<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<Success<NewsletterResponse>>, ApiError> {
    let filename = require("filename", &payload.filename)?;
    let patch = NewsletterPatch {
        title: payload
            .title
            .map(|title| require("title", &title))
            .transpose()?,
        content: payload
            .content
            .map(|content| require("content", &content))
            .transpose()?,
        url: payload.url.map(optional),
        sent_date: payload
            .sent_date
            .map(|date| parse_date(&date))
            .transpose()?,
    };

    let newsletter = composer_for(&state)
        .recompose(&filename, patch, Utc::now())
        .await?;
    let public_url = state.store().public_url(&newsletter.html_file_path);
    Ok(success(NewsletterResponse {
        newsletter,
        public_url,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendNewsletterRequest {
    #[serde(default)]
    filename: String,
    subject: Option<String>,
    #[serde(default)]
    recipients: Vec<Recipient>,
}

#[instrument(skip_all, fields(filename = %payload.filename, recipients = payload.recipients.len()))]
async fn send<S: AppState>(
    _admin: AdminAuth,
    State(state): State<S>,
    Json(payload): Json<SendNewsletterRequest>,
) -> Result<Json<Success<SendReport>>, ApiError> {
    let filename = require("filename", &payload.filename)?;
    let recipients = payload
        .recipients
        .into_iter()
        .map(|recipient| -> Result<Recipient, ApiError> {
            Ok(Recipient {
                email: validate_email(&recipient.email)?,
                name: optional(recipient.name),
                company: optional(recipient.company),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let report = sender_for(&state)?
        .send(
            SendRequest {
                filename,
                subject: optional(payload.subject),
                recipients,
            },
            Utc::now(),
        )
        .await?;
    Ok(success(report))
}

pub fn router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/newsletters", get(list::<S>))
        .route("/newsletter-create", post(create::<S>))
        .route("/newsletter-update", post(update::<S>))
        .route("/newsletter-send", post(send::<S>))
}
