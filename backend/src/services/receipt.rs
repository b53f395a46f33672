//! Receipt intake: turns supplier receipt lines into lots.
//!
//! Each line's quantity is split into two quality grades; every grade
//! with a positive quantity becomes its own lot, seeded into the
//! destination warehouse with a full allocation. The whole intake is one
//! transaction: receipt, lines, lots, allocations, the inbound movement
//! and the aggregate deltas commit together.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::{
    validation, Lot, LotClass, MovementEffect, MovementType, Receipt, ReceiptLineInput,
    RegisterReceiptInput, UpdateReceiptNoteInput,
};

use crate::error::{AppError, AppResult};
use crate::services::lot::{lot_from_row, LotRow, LOT_COLUMNS};
use crate::services::movement::{self, NewMovement};
use crate::services::stock::StockDeltas;
use crate::services::{product, warehouse};

/// Reference type recorded on inbound movements
pub const RECEIPT_REFERENCE: &str = "receipt";

/// The per-grade lots a receipt line produces (zero-quantity grades are
/// skipped).
pub fn grade_lots(line: &ReceiptLineInput) -> Vec<(LotClass, Decimal)> {
    [
        (LotClass::GradeA, line.quantity_grade_a),
        (LotClass::GradeB, line.quantity_grade_b),
    ]
    .into_iter()
    .filter(|(_, quantity)| *quantity > Decimal::ZERO)
    .collect()
}

/// Result of a registered receipt
#[derive(Debug, Serialize)]
pub struct RegisteredReceipt {
    pub receipt: Receipt,
    pub lots: Vec<Lot>,
    pub movement_id: Uuid,
}

/// Receipt intake service
#[derive(Clone)]
pub struct ReceiptService {
    db: PgPool,
}

impl ReceiptService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a receipt and create its lots.
    pub async fn register_receipt(
        &self,
        input: RegisterReceiptInput,
    ) -> AppResult<RegisteredReceipt> {
        input.validate()?;

        // Defense in depth: the storage layer re-checks the grade split.
        for (index, line) in input.lines.iter().enumerate() {
            validation::validate_quantity(line.quantity).map_err(|message| {
                AppError::Validation {
                    field: format!("lines[{}].quantity", index),
                    message: message.to_string(),
                }
            })?;
            validation::validate_grade_split(
                line.quantity,
                line.quantity_grade_a,
                line.quantity_grade_b,
            )
            .map_err(|message| AppError::Validation {
                field: format!("lines[{}]", index),
                message: message.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        warehouse::ensure_warehouse(&mut tx, input.warehouse_id).await?;
        for line in &input.lines {
            product::ensure_product(&mut tx, line.product_id).await?;
        }

        let (receipt_id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO receipts (receipt_date, supplier_ref, note)
            VALUES ($1, $2, $3)
            RETURNING id, created_at
            "#,
        )
        .bind(input.receipt_date)
        .bind(&input.supplier_ref)
        .bind(&input.note)
        .fetch_one(&mut *tx)
        .await?;

        let receipt_ref = receipt_id.to_string();
        let movement_id = movement::insert_movement(
            &mut tx,
            &NewMovement {
                movement_type: MovementType::Inbound,
                source_warehouse_id: None,
                dest_warehouse_id: Some(input.warehouse_id),
                reference_type: Some(RECEIPT_REFERENCE),
                reference_id: Some(&receipt_ref),
                note: None,
            },
        )
        .await?;

        let mut deltas = StockDeltas::new();
        let mut lots = Vec::new();

        for line in &input.lines {
            let line_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO receipt_lines (
                    receipt_id, product_id, unit, quantity,
                    quantity_grade_a, quantity_grade_b, billing_entity
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(receipt_id)
            .bind(line.product_id)
            .bind(&line.unit)
            .bind(line.quantity)
            .bind(line.quantity_grade_a)
            .bind(line.quantity_grade_b)
            .bind(&line.billing_entity)
            .fetch_one(&mut *tx)
            .await?;

            for (lot_class, quantity) in grade_lots(line) {
                let lot_row = sqlx::query_as::<_, LotRow>(&format!(
                    r#"
                    INSERT INTO lots (receipt_line_id, product_id, origin_date, lot_class, initial_qty, available_qty)
                    VALUES ($1, $2, $3, $4, $5, $5)
                    RETURNING {}
                    "#,
                    LOT_COLUMNS
                ))
                .bind(line_id)
                .bind(line.product_id)
                .bind(input.receipt_date)
                .bind(lot_class.code())
                .bind(quantity)
                .fetch_one(&mut *tx)
                .await?;

                let lot = lot_from_row(lot_row)?;

                sqlx::query(
                    r#"
                    INSERT INTO lot_warehouse_allocations (lot_id, warehouse_id, assigned_qty, available_qty)
                    VALUES ($1, $2, $3, $3)
                    "#,
                )
                .bind(lot.id)
                .bind(input.warehouse_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;

                movement::insert_line(
                    &mut tx,
                    movement_id,
                    line.product_id,
                    Some(lot.id),
                    Some(input.warehouse_id),
                    quantity,
                    MovementEffect::Entry,
                )
                .await?;
                deltas.add(line.product_id, input.warehouse_id, quantity);

                lots.push(lot);
            }
        }

        deltas.apply(&mut tx).await?;
        tx.commit().await?;

        Ok(RegisteredReceipt {
            receipt: Receipt {
                id: receipt_id,
                receipt_date: input.receipt_date,
                supplier_ref: input.supplier_ref,
                note: input.note,
                created_at,
            },
            lots,
            movement_id,
        })
    }

    /// Edit the header note, the only mutable receipt field.
    pub async fn update_note(
        &self,
        receipt_id: Uuid,
        input: UpdateReceiptNoteInput,
    ) -> AppResult<Receipt> {
        let row = sqlx::query_as::<_, (Uuid, chrono::NaiveDate, String, Option<String>, DateTime<Utc>)>(
            r#"
            UPDATE receipts
            SET note = $1
            WHERE id = $2
            RETURNING id, receipt_date, supplier_ref, note, created_at
            "#,
        )
        .bind(&input.note)
        .bind(receipt_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Receipt".to_string()))?;

        Ok(Receipt {
            id: row.0,
            receipt_date: row.1,
            supplier_ref: row.2,
            note: row.3,
            created_at: row.4,
        })
    }
}
