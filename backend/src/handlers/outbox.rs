//! HTTP handlers for outbox inspection

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{OutboxEvent, OutboxStatus};

use crate::error::{AppError, AppResult};
use crate::services::outbox::OutboxService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OutboxListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// List outbox events, optionally filtered by status
pub async fn list_outbox_events(
    State(state): State<AppState>,
    Query(query): Query<OutboxListQuery>,
) -> AppResult<Json<Vec<OutboxEvent>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            OutboxStatus::from_str(s).ok_or_else(|| AppError::Validation {
                field: "status".to_string(),
                message: format!("Unknown outbox status '{}'", s),
            })
        })
        .transpose()?;

    let service = OutboxService::new(state.db);
    let events = service
        .list_events(status, query.limit.unwrap_or(100))
        .await?;
    Ok(Json(events))
}

/// Get one outbox event
pub async fn get_outbox_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> AppResult<Json<OutboxEvent>> {
    let service = OutboxService::new(state.db);
    let event = service.get_event(event_id).await?;
    Ok(Json(event))
}
