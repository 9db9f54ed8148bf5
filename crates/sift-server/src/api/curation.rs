//! Curation control and ingest endpoints
//!
//! Thin translations between HTTP payloads and the curator handle; all
//! actual decisions happen on the orchestrator's task.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use sift_core::{DecisionEntry, EvaluationRequest, StartOutcome, StatusSnapshot, WireMessage};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let outcome = state.curator.start(request.url, request.target).await?;
    let response = match outcome {
        StartOutcome::Started | StartOutcome::AlreadyRunning => StartResponse {
            started: true,
            reason: None,
        },
        StartOutcome::Declined { reason } => StartResponse {
            started: false,
            reason: Some(reason),
        },
    };
    Ok(Json(response))
}

pub async fn stop(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.curator.stop().await?;
    Ok(Json(serde_json::json!({ "stopped": true })))
}

pub async fn status(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, ApiError> {
    Ok(Json(state.curator.status().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestsRequest {
    pub interests: Vec<String>,
    #[serde(default)]
    pub spam_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

pub async fn set_interests(
    State(state): State<AppState>,
    Json(request): Json<InterestsRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .curator
        .set_interests(request.interests, request.spam_keywords, request.threshold)
        .await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

pub async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluationRequest>,
) -> Result<Json<Value>, ApiError> {
    state.curator.evaluate(request).await?;
    Ok(Json(serde_json::json!({ "accepted": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub id: String,
    pub is_uninteresting: bool,
    pub reason: String,
}

pub async fn classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let result = state.curator.classify(request.text).await?;
    Ok(Json(ClassifyResponse {
        id: request.id,
        is_uninteresting: result.is_uninteresting,
        reason: result.reason,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub id: String,
    pub is_uninteresting: bool,
}

pub async fn mark(
    State(state): State<AppState>,
    Json(request): Json<MarkRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .curator
        .mark_tweet(request.id, request.is_uninteresting)
        .await?;
    Ok(Json(serde_json::json!({ "marked": true })))
}

pub async fn retry_model(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.curator.retry_model_load().await?;
    Ok(Json(serde_json::json!({ "retrying": true })))
}

pub async fn export_log(
    State(state): State<AppState>,
) -> Result<Json<Vec<DecisionEntry>>, ApiError> {
    Ok(Json(state.curator.export_log().await?))
}

/// Raw wire dispatch: accepts any tagged message and returns its reply.
pub async fn message(
    State(state): State<AppState>,
    Json(message): Json<WireMessage>,
) -> Result<Json<Value>, ApiError> {
    let reply = state.curator.dispatch_wire(message).await?;
    Ok(Json(reply))
}
