//! Manual ledger corrections: shrinkage write-offs and corrections.
//!
//! One lot/allocation pair per adjustment, with the same lockstep
//! decrement/increment, movement record and aggregate delta as the
//! engines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::{validation, MovementEffect, MovementType};

use crate::error::{AppError, AppResult};
use crate::services::movement::{self, NewMovement};
use crate::services::stock::StockDeltas;

/// Why the adjustment is being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Physical loss; always an exit
    Shrinkage,
    /// Count correction in either direction
    Correction,
}

/// Input for a manual adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustmentInput {
    pub lot_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub effect: MovementEffect,
    pub reason: AdjustmentReason,
    pub note: Option<String>,
}

/// Result of a manual adjustment
#[derive(Debug, Serialize)]
pub struct AdjustmentOutcome {
    pub movement_id: Uuid,
}

/// Manual adjustment service
#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
}

impl AdjustmentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn record_adjustment(&self, input: AdjustmentInput) -> AppResult<AdjustmentOutcome> {
        validation::validate_quantity(input.quantity).map_err(|message| AppError::Validation {
            field: "quantity".to_string(),
            message: message.to_string(),
        })?;
        if input.reason == AdjustmentReason::Shrinkage && input.effect != MovementEffect::Exit {
            return Err(AppError::Validation {
                field: "effect".to_string(),
                message: "Shrinkage must be an exit".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        let (product_id, lot_available) = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT product_id, available_qty FROM lots WHERE id = $1 FOR UPDATE",
        )
        .bind(input.lot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        let (allocation_id, allocation_available) = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT id, available_qty
            FROM lot_warehouse_allocations
            WHERE lot_id = $1 AND warehouse_id = $2
            FOR UPDATE
            "#,
        )
        .bind(input.lot_id)
        .bind(input.warehouse_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot allocation".to_string()))?;

        if input.effect == MovementEffect::Exit
            && (lot_available < input.quantity || allocation_available < input.quantity)
        {
            return Err(AppError::InsufficientStock(format!(
                "lot has {} available ({} in warehouse), {} requested",
                lot_available, allocation_available, input.quantity
            )));
        }

        let signed = input.quantity * Decimal::from(input.effect.code());

        sqlx::query("UPDATE lots SET available_qty = available_qty + $1 WHERE id = $2")
            .bind(signed)
            .bind(input.lot_id)
            .execute(&mut *tx)
            .await?;

        // An entry also raises the cumulative assignment to the warehouse.
        sqlx::query(
            r#"
            UPDATE lot_warehouse_allocations
            SET available_qty = available_qty + $1,
                assigned_qty = assigned_qty + GREATEST($1, 0)
            WHERE id = $2
            "#,
        )
        .bind(signed)
        .bind(allocation_id)
        .execute(&mut *tx)
        .await?;

        let movement_type = match input.reason {
            AdjustmentReason::Shrinkage => MovementType::Shrinkage,
            AdjustmentReason::Correction => MovementType::Adjustment,
        };
        let (source, dest) = match input.effect {
            MovementEffect::Exit => (Some(input.warehouse_id), None),
            MovementEffect::Entry => (None, Some(input.warehouse_id)),
        };

        let movement_id = movement::insert_movement(
            &mut tx,
            &NewMovement {
                movement_type,
                source_warehouse_id: source,
                dest_warehouse_id: dest,
                reference_type: None,
                reference_id: None,
                note: input.note.as_deref(),
            },
        )
        .await?;

        movement::insert_line(
            &mut tx,
            movement_id,
            product_id,
            Some(input.lot_id),
            Some(input.warehouse_id),
            input.quantity,
            input.effect,
        )
        .await?;

        let mut deltas = StockDeltas::new();
        deltas.add(product_id, input.warehouse_id, signed);
        deltas.apply(&mut tx).await?;

        tx.commit().await?;

        Ok(AdjustmentOutcome { movement_id })
    }
}
