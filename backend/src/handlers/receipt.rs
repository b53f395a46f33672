//! HTTP handlers for receipt intake

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::{Receipt, RegisterReceiptInput, UpdateReceiptNoteInput};

use crate::error::AppResult;
use crate::services::consumption::ConsumptionService;
use crate::services::receipt::{ReceiptService, RegisteredReceipt};
use crate::AppState;

/// Register a supplier receipt and create its lots
pub async fn register_receipt(
    State(state): State<AppState>,
    Json(input): Json<RegisterReceiptInput>,
) -> AppResult<Json<RegisteredReceipt>> {
    let service = ReceiptService::new(state.db.clone());
    let registered = service.register_receipt(input).await?;

    // Fresh supply may settle queued shortfalls; a failed replay does not
    // fail the intake.
    let consumption = ConsumptionService::new(state.db, state.config.consumption.shortfall_policy);
    let mut products: Vec<Uuid> = registered.lots.iter().map(|l| l.product_id).collect();
    products.sort();
    products.dedup();
    for product_id in products {
        if let Err(e) = consumption.replay_pending(product_id).await {
            tracing::warn!(
                "Pending replay after receipt failed for product {}: {:?}",
                product_id,
                e
            );
        }
    }

    Ok(Json(registered))
}

/// Edit a receipt's note
pub async fn update_receipt_note(
    State(state): State<AppState>,
    Path(receipt_id): Path<Uuid>,
    Json(input): Json<UpdateReceiptNoteInput>,
) -> AppResult<Json<Receipt>> {
    let service = ReceiptService::new(state.db);
    let receipt = service.update_note(receipt_id, input).await?;
    Ok(Json(receipt))
}
