//! HTTP handlers for fractionation

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::fractionation::{
    FractionationInput, FractionationOutcome, FractionationService,
};
use crate::AppState;

/// Execute a fractionation batch
pub async fn fractionate(
    State(state): State<AppState>,
    Json(input): Json<FractionationInput>,
) -> AppResult<Json<FractionationOutcome>> {
    let service = FractionationService::new(state.db);
    let outcome = service.fractionate(input).await?;
    Ok(Json(outcome))
}
