//! HTTP surface: Twilio webhook, manual triggers, and review utilities.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::{Error, SourceError};
use crate::reviews::GoogleBusinessClient;
use crate::workflow::WorkflowEngine;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    /// Present only when reviews come from Google; enables the OAuth routes.
    pub google: Option<Arc<GoogleBusinessClient>>,
}

/// Build the Axum router.
pub fn app_routes(engine: Arc<WorkflowEngine>, google: Option<Arc<GoogleBusinessClient>>) -> Router {
    let state = AppState { engine, google };

    Router::new()
        .route("/health", get(health))
        .route("/sms/webhook", post(sms_webhook))
        .route("/sms/send", post(send_sms))
        .route("/daily-workflow", post(daily_workflow))
        .route("/workflow/status", get(workflow_status))
        .route("/reviews", get(list_reviews))
        .route("/reviews/summarize", post(summarize))
        .route("/reviews/summarize-and-send", post(summarize_and_send))
        .route("/reviews/{id}/reply", post(reply_to_review))
        .route("/reviews/{id}/generate-reply", post(generate_reply))
        .route("/auth", get(auth))
        .route("/auth/callback", get(auth_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::Source(SourceError::ReviewNotFound(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// ── SMS ─────────────────────────────────────────────────────────────────

/// Fields Twilio posts for an inbound SMS.
#[derive(Deserialize)]
struct InboundSms {
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "From", default)]
    from: String,
}

async fn sms_webhook(State(state): State<AppState>, Form(sms): Form<InboundSms>) -> impl IntoResponse {
    info!(from = %sms.from, "SMS received");
    state.engine.on_inbound_message(&sms.body, &sms.from).await;
    (StatusCode::OK, "OK")
}

#[derive(Deserialize)]
struct SendRequest {
    message: String,
}

async fn send_sms(State(state): State<AppState>, Json(req): Json<SendRequest>) -> Response {
    match state.engine.send_text(&req.message).await {
        Ok(id) => Json(json!({
            "message": "SMS sent successfully",
            "messageId": id,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

// ── Workflow ────────────────────────────────────────────────────────────

async fn daily_workflow(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.engine.trigger_daily_run().await;
    Json(json!({
        "message": "Daily workflow triggered",
        "status": status,
    }))
}

async fn workflow_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.status().await)
}

// ── Reviews ─────────────────────────────────────────────────────────────

async fn list_reviews(State(state): State<AppState>) -> Response {
    match state.engine.unanswered_reviews().await {
        Ok(reviews) => Json(reviews).into_response(),
        Err(e) => error_response(e),
    }
}

async fn summarize(State(state): State<AppState>) -> Response {
    match state.engine.summarize_unanswered().await {
        Ok(summary) => Json(json!({ "summary": summary })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn summarize_and_send(State(state): State<AppState>) -> Response {
    match state.engine.send_summary().await {
        Ok(summary) => Json(json!({
            "message": "Summary sent via SMS",
            "summary": summary,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct ReplyRequest {
    message: String,
}

async fn reply_to_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> Response {
    match state.engine.submit_direct_reply(&id, &req.message).await {
        Ok(()) => Json(json!({
            "message": "Reply submitted",
            "reviewId": id,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn generate_reply(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.engine.generate_reply_for_review(&id).await {
        Ok(generated) => Json(json!({
            "message": "Reply generated and confirmation sent via SMS",
            "confirmationId": generated.code,
            "suggestedReply": generated.draft,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

// ── OAuth ───────────────────────────────────────────────────────────────

fn google_not_configured() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Google review source is not configured" })),
    )
        .into_response()
}

async fn auth(State(state): State<AppState>) -> Response {
    let Some(google) = state.google else {
        return google_not_configured();
    };
    match google.auth_url() {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => error_response(e.into()),
    }
}

#[derive(Deserialize)]
struct CallbackParams {
    code: String,
}

async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(google) = state.google else {
        return google_not_configured();
    };
    match google.exchange_code(&params.code).await {
        Ok(tokens) => {
            info!("Google OAuth code exchanged");
            Json(json!({
                "message": "Authentication successful!",
                "refresh_token": tokens.refresh_token,
            }))
            .into_response()
        }
        Err(e) => error_response(e.into()),
    }
}
