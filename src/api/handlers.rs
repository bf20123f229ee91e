//! Admin API handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::protocol::Envelope;
use crate::stats::{ChannelInfo, ServerStats};

use super::error::ApiError;
use super::AppState;

/// Body of `POST /channels/send`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendFileRequest {
    pub channel: String,
    pub name: String,
    pub extension: String,
    /// Base64-encoded file content
    pub base64: String,
}

/// Response of `POST /channels/send`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendFileResponse {
    pub error: bool,
    pub message: String,
}

/// `GET /channels/list`
pub async fn list_channels(State(state): State<AppState>) -> Json<Vec<ChannelInfo>> {
    Json(state.registry.channels().await)
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> Json<ServerStats> {
    Json(state.registry.stats().await)
}

/// `POST /channels/send`
pub async fn send_file(
    State(state): State<AppState>,
    body: Result<Json<SendFileRequest>, JsonRejection>,
) -> Result<Json<SendFileResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable send body");
        ApiError::BadRequest("error on content received".to_string())
    })?;

    let envelope = Envelope::new(request.name, request.extension, request.base64);
    let report = state.registry.submit(&request.channel, envelope).await?;

    tracing::info!(
        channel = %request.channel,
        delivered = report.delivered,
        evicted = report.evicted.len(),
        "File submitted through admin API"
    );

    Ok(Json(SendFileResponse {
        error: false,
        message: "file sent successfully".to_string(),
    }))
}
