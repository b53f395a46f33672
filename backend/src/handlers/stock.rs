//! HTTP handlers for stock queries

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::{StockLevel, StockSnapshotRow};

use crate::error::AppResult;
use crate::services::stock::StockService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub warehouse_id: Option<Uuid>,
}

/// Current stock of a product, per warehouse or total
pub async fn get_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<StockLevel>> {
    let service = StockService::new(state.db);
    let level = service.get_stock(product_id, query.warehouse_id).await?;
    Ok(Json(level))
}

/// Start-of-day stock snapshot, per product per warehouse
pub async fn get_initial_snapshot(
    State(state): State<AppState>,
    Path(day): Path<NaiveDate>,
) -> AppResult<Json<Vec<StockSnapshotRow>>> {
    let service = StockService::new(state.db);
    let snapshot = service.initial_snapshot(day).await?;
    Ok(Json(snapshot))
}
