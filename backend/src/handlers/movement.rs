//! HTTP handlers for movement log reads

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{Movement, MovementWithLines};

use crate::error::AppResult;
use crate::services::movement::MovementService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MovementListQuery {
    pub reference_type: String,
    pub reference_id: String,
}

/// Get a movement with its lines
pub async fn get_movement(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<MovementWithLines>> {
    let service = MovementService::new(state.db);
    let movement = service.get_movement(movement_id).await?;
    Ok(Json(movement))
}

/// List movements carrying a reference
pub async fn list_movements_by_reference(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> AppResult<Json<Vec<Movement>>> {
    let service = MovementService::new(state.db);
    let movements = service
        .list_by_reference(&query.reference_type, &query.reference_id)
        .await?;
    Ok(Json(movements))
}
