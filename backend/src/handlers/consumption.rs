//! HTTP handlers for FIFO consumption

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::PendingConsumption;

use crate::error::AppResult;
use crate::services::consumption::{
    ConsumeInput, ConsumeOutcome, ConsumptionService, ReplayOutcome,
};
use crate::AppState;

fn service(state: AppState) -> ConsumptionService {
    ConsumptionService::new(state.db, state.config.consumption.shortfall_policy)
}

/// Consume stock for a sale, oldest lots first
pub async fn consume_for_sale(
    State(state): State<AppState>,
    Json(input): Json<ConsumeInput>,
) -> AppResult<Json<ConsumeOutcome>> {
    let outcome = service(state).consume_for_sale(input).await?;
    Ok(Json(outcome))
}

/// Replay queued shortfalls of a product against current supply
pub async fn replay_pending(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ReplayOutcome>> {
    let outcome = service(state).replay_pending(product_id).await?;
    Ok(Json(outcome))
}

/// List queued shortfalls
pub async fn list_pending(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PendingConsumption>>> {
    let pending = service(state).list_pending().await?;
    Ok(Json(pending))
}
