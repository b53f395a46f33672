//! HTTP handlers for lot store access

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::{Lot, LotWithAllocations, SetLotBlockedInput};

use crate::error::AppResult;
use crate::services::lot::LotService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LotListQuery {
    pub product_id: Uuid,
}

/// Get a lot with its warehouse allocations
pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<LotWithAllocations>> {
    let service = LotService::new(state.db);
    let lot = service.get_lot(lot_id).await?;
    Ok(Json(lot))
}

/// List lots of a product in FIFO order
pub async fn list_lots(
    State(state): State<AppState>,
    Query(query): Query<LotListQuery>,
) -> AppResult<Json<Vec<Lot>>> {
    let service = LotService::new(state.db);
    let lots = service.list_by_product(query.product_id).await?;
    Ok(Json(lots))
}

/// Toggle a lot's manual block flag
pub async fn set_lot_blocked(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(input): Json<SetLotBlockedInput>,
) -> AppResult<Json<Lot>> {
    let service = LotService::new(state.db);
    let lot = service.set_blocked(lot_id, input.blocked).await?;
    Ok(Json(lot))
}
