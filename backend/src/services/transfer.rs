//! Inter-warehouse transfer engine.
//!
//! Moves quantities of a product between warehouses without changing the
//! product's total stock. Each transferred unit keeps its lot identity:
//! only the lot's warehouse allocations move, the lot's global
//! availability is untouched. A batch either applies in full or not at
//! all.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::{validation, MovementEffect, MovementType};

use crate::error::{AppError, AppResult};
use crate::services::consumption::{lock_candidates, plan_fifo};
use crate::services::movement::{self, NewMovement};
use crate::services::stock::StockDeltas;
use crate::services::{product, warehouse};

/// Reference type recorded on transfer movements
pub const TRANSFER_REFERENCE: &str = "transfer_batch";

/// One line of a transfer batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub source_warehouse_id: Uuid,
    pub dest_warehouse_id: Uuid,
}

/// Input for a transfer batch
#[derive(Debug, Deserialize, Validate)]
pub struct TransferInput {
    /// Batch idempotency reference; generated when absent
    pub reference: Option<String>,
    pub note: Option<String>,
    #[validate(length(min = 1))]
    pub lines: Vec<TransferLineInput>,
}

/// One lot effect of an executed transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferDetail {
    pub product_id: Uuid,
    pub lot_id: Uuid,
    pub source_warehouse_id: Uuid,
    pub dest_warehouse_id: Uuid,
    pub quantity: Decimal,
}

/// Result of a transfer batch
#[derive(Debug, Serialize)]
pub struct TransferOutcome {
    pub movement_id: Uuid,
    pub detail: Vec<TransferDetail>,
}

/// Validate one transfer line's shape (quantity and warehouse pair).
pub fn validate_line(line: &TransferLineInput) -> Result<(), String> {
    validation::validate_quantity(line.quantity).map_err(str::to_string)?;
    validation::validate_warehouse_pair(line.source_warehouse_id, line.dest_warehouse_id)
        .map_err(str::to_string)?;
    Ok(())
}

fn uniform<T: Copy + PartialEq>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut iter = values;
    let first = iter.next()?;
    iter.all(|v| v == first).then_some(first)
}

/// Transfer engine
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
}

impl TransferService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Execute a transfer batch, FIFO over each line's source warehouse.
    pub async fn transfer(&self, input: TransferInput) -> AppResult<TransferOutcome> {
        input.validate()?;
        for (index, line) in input.lines.iter().enumerate() {
            validate_line(line).map_err(|message| AppError::Validation {
                field: format!("lines[{}]", index),
                message,
            })?;
        }

        let mut tx = self.db.begin().await?;

        for line in &input.lines {
            product::ensure_product(&mut tx, line.product_id).await?;
            warehouse::ensure_warehouse(&mut tx, line.source_warehouse_id).await?;
            warehouse::ensure_warehouse(&mut tx, line.dest_warehouse_id).await?;
        }

        let batch_ref = input
            .reference
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // The header carries the warehouses only when the batch is uniform.
        let source = uniform(input.lines.iter().map(|l| l.source_warehouse_id));
        let dest = uniform(input.lines.iter().map(|l| l.dest_warehouse_id));

        let movement_id = movement::insert_movement(
            &mut tx,
            &NewMovement {
                movement_type: MovementType::Transfer,
                source_warehouse_id: source,
                dest_warehouse_id: dest,
                reference_type: Some(TRANSFER_REFERENCE),
                reference_id: Some(&batch_ref),
                note: input.note.as_deref(),
            },
        )
        .await?;

        let mut deltas = StockDeltas::new();
        let mut detail = Vec::new();

        for line in &input.lines {
            let candidates =
                lock_candidates(&mut tx, line.product_id, Some(line.source_warehouse_id)).await?;
            let plan = plan_fifo(&candidates, line.quantity);

            // No partial transfer: any short line fails the whole batch.
            if plan.shortfall > Decimal::ZERO {
                return Err(AppError::InsufficientStock(format!(
                    "transfer of {} requested with only {} available in source warehouse",
                    line.quantity, plan.applied
                )));
            }

            for take in &plan.takes {
                self.move_allocation(&mut tx, line, take.lot_id, take.allocation_id, take.quantity)
                    .await?;

                movement::insert_line(
                    &mut tx,
                    movement_id,
                    line.product_id,
                    Some(take.lot_id),
                    Some(line.source_warehouse_id),
                    take.quantity,
                    MovementEffect::Exit,
                )
                .await?;
                movement::insert_line(
                    &mut tx,
                    movement_id,
                    line.product_id,
                    Some(take.lot_id),
                    Some(line.dest_warehouse_id),
                    take.quantity,
                    MovementEffect::Entry,
                )
                .await?;

                deltas.add(line.product_id, line.source_warehouse_id, -take.quantity);
                deltas.add(line.product_id, line.dest_warehouse_id, take.quantity);

                detail.push(TransferDetail {
                    product_id: line.product_id,
                    lot_id: take.lot_id,
                    source_warehouse_id: line.source_warehouse_id,
                    dest_warehouse_id: line.dest_warehouse_id,
                    quantity: take.quantity,
                });
            }
        }

        deltas.apply(&mut tx).await?;
        tx.commit().await?;

        Ok(TransferOutcome {
            movement_id,
            detail,
        })
    }

    /// Shift quantity from the locked source allocation to the
    /// destination allocation of the same lot, creating it on first use.
    /// The lot's global availability is deliberately untouched.
    async fn move_allocation(
        &self,
        conn: &mut PgConnection,
        line: &TransferLineInput,
        lot_id: Uuid,
        source_allocation_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE lot_warehouse_allocations SET available_qty = available_qty - $1 WHERE id = $2",
        )
        .bind(quantity)
        .bind(source_allocation_id)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO lot_warehouse_allocations (lot_id, warehouse_id, assigned_qty, available_qty)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (lot_id, warehouse_id)
            DO UPDATE SET assigned_qty = lot_warehouse_allocations.assigned_qty + EXCLUDED.assigned_qty,
                          available_qty = lot_warehouse_allocations.available_qty + EXCLUDED.available_qty
            "#,
        )
        .bind(lot_id)
        .bind(line.dest_warehouse_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform() {
        assert_eq!(uniform([1, 1, 1].into_iter()), Some(1));
        assert_eq!(uniform([1, 2].into_iter()), None);
        assert_eq!(uniform(std::iter::empty::<i32>()), None);
    }
}
