//! Fractionation engine.
//!
//! Consumes a quantity from one source lot in one warehouse and produces
//! new lots of different products in the same warehouse, either from
//! explicit destination amounts or from a multiplicative conversion
//! factor. Derived lots inherit the source lot's receipt line and origin
//! date, preserving FIFO ancestry and the audit trail. A batch applies
//! in full or not at all.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::{round_qty, validation, LotClass, MovementEffect, MovementType};

use crate::error::{AppError, AppResult};
use crate::services::movement::{self, NewMovement};
use crate::services::product;
use crate::services::stock::StockDeltas;

/// Reference type recorded on fractionation movements
pub const FRACTIONATION_REFERENCE: &str = "fractionation";

/// One explicit destination amount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationAmount {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// How the consumed quantity turns into destination lots
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DestinationSpec {
    /// Explicit amounts; they need not sum to the consumed quantity
    Amounts { amounts: Vec<DestinationAmount> },
    /// One destination product, produced = consumed * factor
    Factor { product_id: Uuid, factor: Decimal },
}

/// Expand a destination spec into (product, quantity) outputs.
pub fn expand_destinations(
    consumed: Decimal,
    spec: &DestinationSpec,
) -> Result<Vec<(Uuid, Decimal)>, String> {
    match spec {
        DestinationSpec::Amounts { amounts } => {
            if amounts.is_empty() {
                return Err("At least one destination is required".to_string());
            }
            let mut outputs = Vec::with_capacity(amounts.len());
            for amount in amounts {
                validation::validate_quantity(amount.quantity).map_err(str::to_string)?;
                outputs.push((amount.product_id, amount.quantity));
            }
            Ok(outputs)
        }
        DestinationSpec::Factor { product_id, factor } => {
            validation::validate_factor(*factor).map_err(str::to_string)?;
            let produced = round_qty(consumed * factor);
            if produced <= Decimal::ZERO {
                return Err("Conversion factor yields a zero output".to_string());
            }
            Ok(vec![(*product_id, produced)])
        }
    }
}

/// One line of a fractionation batch
#[derive(Debug, Serialize, Deserialize)]
pub struct FractionationLineInput {
    pub source_lot_id: Uuid,
    /// Declared product of the source lot; a mismatch fails the batch
    pub source_product_id: Uuid,
    pub warehouse_id: Uuid,
    /// Quantity consumed from the source lot
    pub quantity: Decimal,
    pub destinations: DestinationSpec,
}

/// Input for a fractionation batch
#[derive(Debug, Deserialize, Validate)]
pub struct FractionationInput {
    pub note: Option<String>,
    #[validate(length(min = 1))]
    pub lines: Vec<FractionationLineInput>,
}

/// One produced lot
#[derive(Debug, Clone, Serialize)]
pub struct FractionationOutput {
    pub lot_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// Executed effect of one fractionation line
#[derive(Debug, Serialize)]
pub struct FractionationDetail {
    pub source_lot_id: Uuid,
    pub consumed: Decimal,
    pub outputs: Vec<FractionationOutput>,
}

/// Result of a fractionation batch
#[derive(Debug, Serialize)]
pub struct FractionationOutcome {
    pub movement_id: Uuid,
    pub detail: Vec<FractionationDetail>,
}

/// Fractionation engine
#[derive(Clone)]
pub struct FractionationService {
    db: PgPool,
}

impl FractionationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Execute a fractionation batch. All lines share one movement
    /// header; any failing line rolls the whole batch back.
    pub async fn fractionate(&self, input: FractionationInput) -> AppResult<FractionationOutcome> {
        input.validate()?;
        for (index, line) in input.lines.iter().enumerate() {
            validation::validate_quantity(line.quantity).map_err(|message| {
                AppError::Validation {
                    field: format!("lines[{}].quantity", index),
                    message: message.to_string(),
                }
            })?;
        }

        let mut tx = self.db.begin().await?;

        let batch_ref = Uuid::new_v4().to_string();
        let movement_id = movement::insert_movement(
            &mut tx,
            &NewMovement {
                movement_type: MovementType::Adjustment,
                source_warehouse_id: None,
                dest_warehouse_id: None,
                reference_type: Some(FRACTIONATION_REFERENCE),
                reference_id: Some(&batch_ref),
                note: input.note.as_deref(),
            },
        )
        .await?;

        let mut deltas = StockDeltas::new();
        let mut detail = Vec::new();

        for (index, line) in input.lines.iter().enumerate() {
            let outputs = expand_destinations(line.quantity, &line.destinations).map_err(
                |message| AppError::Validation {
                    field: format!("lines[{}].destinations", index),
                    message,
                },
            )?;

            // Lock the source lot for the duration of the transaction.
            let source = sqlx::query_as::<_, (Uuid, Uuid, chrono::NaiveDate, Decimal, bool)>(
                r#"
                SELECT receipt_line_id, product_id, origin_date, available_qty, blocked
                FROM lots
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(line.source_lot_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Source lot".to_string()))?;

            let (receipt_line_id, lot_product_id, origin_date, lot_available, blocked) = source;

            if lot_product_id != line.source_product_id {
                return Err(AppError::Validation {
                    field: format!("lines[{}].source_product_id", index),
                    message: "Declared product does not match the source lot".to_string(),
                });
            }
            if blocked {
                return Err(AppError::Validation {
                    field: format!("lines[{}].source_lot_id", index),
                    message: "Source lot is blocked".to_string(),
                });
            }
            if lot_available < line.quantity {
                return Err(AppError::InsufficientStock(format!(
                    "lot has {} available, {} requested",
                    lot_available, line.quantity
                )));
            }

            let allocation = sqlx::query_as::<_, (Uuid, Decimal)>(
                r#"
                SELECT id, available_qty
                FROM lot_warehouse_allocations
                WHERE lot_id = $1 AND warehouse_id = $2
                FOR UPDATE
                "#,
            )
            .bind(line.source_lot_id)
            .bind(line.warehouse_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Lot allocation".to_string()))?;

            let (allocation_id, allocation_available) = allocation;
            if allocation_available < line.quantity {
                return Err(AppError::InsufficientStock(format!(
                    "allocation has {} available in warehouse, {} requested",
                    allocation_available, line.quantity
                )));
            }

            sqlx::query("UPDATE lots SET available_qty = available_qty - $1 WHERE id = $2")
                .bind(line.quantity)
                .bind(line.source_lot_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "UPDATE lot_warehouse_allocations SET available_qty = available_qty - $1 WHERE id = $2",
            )
            .bind(line.quantity)
            .bind(allocation_id)
            .execute(&mut *tx)
            .await?;

            movement::insert_line(
                &mut tx,
                movement_id,
                line.source_product_id,
                Some(line.source_lot_id),
                Some(line.warehouse_id),
                line.quantity,
                MovementEffect::Exit,
            )
            .await?;
            deltas.add(line.source_product_id, line.warehouse_id, -line.quantity);

            let mut line_outputs = Vec::with_capacity(outputs.len());
            for (dest_product_id, dest_quantity) in outputs {
                if dest_product_id == line.source_product_id {
                    return Err(AppError::Validation {
                        field: format!("lines[{}].destinations", index),
                        message: "Destination product must differ from the source product"
                            .to_string(),
                    });
                }
                product::ensure_product(&mut tx, dest_product_id).await?;

                // Derived lots keep the source's receipt line and origin
                // date so FIFO ancestry survives the conversion.
                let lot_id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO lots (receipt_line_id, product_id, origin_date, lot_class, initial_qty, available_qty)
                    VALUES ($1, $2, $3, $4, $5, $5)
                    RETURNING id
                    "#,
                )
                .bind(receipt_line_id)
                .bind(dest_product_id)
                .bind(origin_date)
                .bind(LotClass::Derived.code())
                .bind(dest_quantity)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO lot_warehouse_allocations (lot_id, warehouse_id, assigned_qty, available_qty)
                    VALUES ($1, $2, $3, $3)
                    "#,
                )
                .bind(lot_id)
                .bind(line.warehouse_id)
                .bind(dest_quantity)
                .execute(&mut *tx)
                .await?;

                movement::insert_line(
                    &mut tx,
                    movement_id,
                    dest_product_id,
                    Some(lot_id),
                    Some(line.warehouse_id),
                    dest_quantity,
                    MovementEffect::Entry,
                )
                .await?;
                deltas.add(dest_product_id, line.warehouse_id, dest_quantity);

                line_outputs.push(FractionationOutput {
                    lot_id,
                    product_id: dest_product_id,
                    quantity: dest_quantity,
                });
            }

            detail.push(FractionationDetail {
                source_lot_id: line.source_lot_id,
                consumed: line.quantity,
                outputs: line_outputs,
            });
        }

        deltas.apply(&mut tx).await?;
        tx.commit().await?;

        Ok(FractionationOutcome {
            movement_id,
            detail,
        })
    }
}
