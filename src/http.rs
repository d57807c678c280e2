//! HTTP surface: the platform webhook and the reminder trigger.
//!
//! Signature verification of webhook deliveries happens upstream (reverse
//! proxy / platform SDK); this layer only parses the pre-verified JSON
//! body. The reminder trigger is guarded by a static bearer token.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::chat::reply::Reply;
use crate::chat::{ChatEngine, UserInput};
use crate::reminder::Scanner;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    pub scanner: Arc<Scanner>,
    pub reminder_token: SecretString,
}

/// One inbound platform event, as delivered by the webhook.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Text { user_id: String, text: String },
    DatePicked { user_id: String, date: NaiveDate },
    TimePicked { user_id: String, time: String },
    Follow { user_id: String },
    Unfollow { user_id: String },
}

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    pub events: Vec<InboundEvent>,
}

/// Build the application router.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/reminder/send", post(send_reminders))
        .with_state(state)
}

/// POST /webhook — handle a batch of inbound events and return the
/// replies to send.
async fn webhook(State(state): State<AppState>, Json(body): Json<WebhookBody>) -> Response {
    let mut replies: Vec<Reply> = Vec::new();
    for event in body.events {
        match handle_event(&state.engine, event).await {
            Ok(Some(reply)) => replies.push(reply),
            Ok(None) => {}
            Err(err) => {
                tracing::error!(%err, "Webhook event failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "internal server error"})),
                )
                    .into_response();
            }
        }
    }
    Json(serde_json::json!({ "replies": replies })).into_response()
}

async fn handle_event(
    engine: &ChatEngine,
    event: InboundEvent,
) -> Result<Option<Reply>, crate::error::Error> {
    match event {
        InboundEvent::Text { user_id, text } => engine
            .handle_message(&user_id, UserInput::Text(text))
            .await
            .map(Some),
        InboundEvent::DatePicked { user_id, date } => engine
            .handle_message(&user_id, UserInput::Date(date))
            .await
            .map(Some),
        InboundEvent::TimePicked { user_id, time } => match parse_picker_time(&time) {
            Some(time) => engine
                .handle_message(&user_id, UserInput::Time(time))
                .await
                .map(Some),
            None => {
                tracing::warn!(input = %time, "Undecodable picker time, dropping event");
                Ok(None)
            }
        },
        InboundEvent::Follow { user_id } => engine.register_follow(&user_id).await.map(Some),
        InboundEvent::Unfollow { user_id } => engine.register_unfollow(&user_id).await.map(|()| None),
    }
}

fn parse_picker_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// POST /reminder/send — run the scanner for the current hour slot.
///
/// `Authorization: Bearer <token>` compared for exact match: 401 when the
/// header is missing or malformed, 403 on a mismatch.
async fn send_reminders(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(token) = token else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "missing or invalid Authorization header"})),
        )
            .into_response();
    };
    if token != state.reminder_token.expose_secret() {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "invalid token"})),
        )
            .into_response();
    }

    match state.scanner.run(Utc::now()).await {
        Ok(summary) => Json(serde_json::json!({
            "status": "success",
            "summary": summary,
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(%err, "Reminder scan failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "internal server error"})),
            )
                .into_response()
        }
    }
}
