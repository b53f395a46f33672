//! HTTP handlers for manual adjustments

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::adjustment::{AdjustmentInput, AdjustmentOutcome, AdjustmentService};
use crate::AppState;

/// Record a manual shrinkage or correction
pub async fn record_adjustment(
    State(state): State<AppState>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<Json<AdjustmentOutcome>> {
    let service = AdjustmentService::new(state.db);
    let outcome = service.record_adjustment(input).await?;
    Ok(Json(outcome))
}
