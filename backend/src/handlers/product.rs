//! HTTP handlers for the product catalog

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::{Product, UpsertProductInput};

use crate::error::AppResult;
use crate::services::product::ProductService;
use crate::AppState;

/// Upsert a product; the change propagates to the sales system through
/// the outbox
pub async fn upsert_product(
    State(state): State<AppState>,
    Json(input): Json<UpsertProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.upsert_product(input).await?;
    Ok(Json(product))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}
