//! HTTP handlers for warehouses

use axum::{extract::State, Json};
use serde::Deserialize;

use shared::Warehouse;

use crate::error::AppResult;
use crate::services::warehouse::WarehouseService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub code: String,
    pub name: String,
}

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    let service = WarehouseService::new(state.db);
    let warehouse = service.create_warehouse(&input.code, &input.name).await?;
    Ok(Json(warehouse))
}

/// List warehouses
pub async fn list_warehouses(State(state): State<AppState>) -> AppResult<Json<Vec<Warehouse>>> {
    let service = WarehouseService::new(state.db);
    let warehouses = service.list_warehouses().await?;
    Ok(Json(warehouses))
}
