use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use crate::AppState;
use crate::errors::ApiError;
use crate::leads::{
    Contact, ContactRequest, Inquiry, InquiryRequest, Signup, SignupOutcome, SignupRequest,
    contact_blocks, inquiry_blocks, register_signup,
};
use crate::routes::{Success, success};

#[derive(Debug, Serialize)]
struct Delivered {
    message: &'static str,
}

#[instrument(skip_all)]
async fn inquiry<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<InquiryRequest>,
) -> Result<Json<Success<Delivered>>, ApiError> {
    let inquiry = Inquiry::try_from(payload)?;
    let config = state.config();
    let webhook = config
        .slack
        .inquiry
        .as_deref()
        .ok_or(ApiError::NotConfigured("SLACK_WEBHOOK_INQUIRY"))?;

    let message = inquiry_blocks(&inquiry, Utc::now(), config.collect.timezone);
    state.slack().post(webhook, &message).await?;

    info!(email = %inquiry.email, "Inquiry forwarded to Slack");
    Ok(success(Delivered {
        message: "Inquiry received",
    }))
}

#[instrument(skip_all)]
async fn newsletter_signup<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<Success<SignupOutcome>>, ApiError> {
    let signup = Signup::try_from(payload)?;
    let config = state.config();

    let outcome = register_signup(
        state.slack(),
        config.slack.newsletter.as_deref(),
        &state.subscribers(),
        &signup,
        Utc::now(),
        config.collect.timezone,
    )
    .await?;
    Ok(success(outcome))
}

#[instrument(skip_all)]
async fn contact<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<Success<Delivered>>, ApiError> {
    let contact = Contact::try_from(payload)?;
    let config = state.config();
    let webhook = config
        .slack
        .contact
        .as_deref()
        .or(config.slack.inquiry.as_deref())
        .ok_or(ApiError::NotConfigured("SLACK_WEBHOOK_CONTACT"))?;

    let message = contact_blocks(&contact, Utc::now(), config.collect.timezone);
    state.slack().post(webhook, &message).await?;

    info!(email = %contact.email, "Contact request forwarded to Slack");
    Ok(success(Delivered {
        message: "Contact request received",
    }))
}

pub fn router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/inquiry-to-slack", post(inquiry::<S>))
        .route("/newsletter-to-slack", post(newsletter_signup::<S>))
        .route("/contact-to-slack", post(contact::<S>))
}
