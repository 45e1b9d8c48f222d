//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;

use crate::{
    domain::UserId,
    infrastructure::dto::http::{ConversationSummaryDto, ErrorDto, MessageDto},
    ui::state::AppState,
    usecase::QueryError,
};

use super::credential::token_from_headers;

type ApiError = (StatusCode, Json<ErrorDto>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorDto {
            detail: detail.into(),
        }),
    )
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidPeer(reason) => api_error(StatusCode::BAD_REQUEST, reason),
            QueryError::Storage(e) => {
                tracing::error!("Query failed: {}", e);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
            }
        }
    }
}

/// Query parameters for the message history endpoint
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// List the caller's conversations, most recent first
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ConversationSummaryDto>>, ApiError> {
    let owner = authenticate(&state, &headers)?;
    let summaries = state.list_conversations_usecase.execute(&owner).await?;

    // Domain Model から DTO への変換
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// Recent messages between the caller and `peer`, oldest first
pub async fn get_recent_messages(
    State(state): State<Arc<AppState>>,
    Path(peer): Path<String>,
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let user = authenticate(&state, &headers)?;
    let messages = state
        .get_recent_messages_usecase
        .execute(&user, peer, query.limit)
        .await?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserId, ApiError> {
    let token = token_from_headers(headers)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "missing credential"))?;
    state.identity_verifier.verify(&token).map_err(|e| {
        tracing::debug!("Rejected HTTP request: {}", e);
        api_error(StatusCode::UNAUTHORIZED, e.to_string())
    })
}
