//! Movement log: append-only header+line record of every ledger-affecting
//! operation.
//!
//! The write helpers run on the caller's connection so a movement is only
//! ever committed together with the lot mutations it describes.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::{Movement, MovementEffect, MovementLine, MovementType, MovementWithLines};

use crate::error::{AppError, AppResult};

/// Header fields for a new movement
pub struct NewMovement<'a> {
    pub movement_type: MovementType,
    pub source_warehouse_id: Option<Uuid>,
    pub dest_warehouse_id: Option<Uuid>,
    pub reference_type: Option<&'a str>,
    pub reference_id: Option<&'a str>,
    pub note: Option<&'a str>,
}

/// Append a movement header inside the caller's transaction.
pub(crate) async fn insert_movement(
    conn: &mut PgConnection,
    movement: &NewMovement<'_>,
) -> AppResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO movements (
            movement_type, source_warehouse_id, dest_warehouse_id,
            reference_type, reference_id, note
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(movement.movement_type.as_str())
    .bind(movement.source_warehouse_id)
    .bind(movement.dest_warehouse_id)
    .bind(movement.reference_type)
    .bind(movement.reference_id)
    .bind(movement.note)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Append one movement line inside the caller's transaction.
pub(crate) async fn insert_line(
    conn: &mut PgConnection,
    movement_id: Uuid,
    product_id: Uuid,
    lot_id: Option<Uuid>,
    warehouse_id: Option<Uuid>,
    quantity: Decimal,
    effect: MovementEffect,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO movement_lines (movement_id, product_id, lot_id, warehouse_id, quantity, effect)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(movement_id)
    .bind(product_id)
    .bind(lot_id)
    .bind(warehouse_id)
    .bind(quantity)
    .bind(effect.code())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

type MovementRow = (
    Uuid,
    String,
    Option<Uuid>,
    Option<Uuid>,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

fn movement_from_row(row: MovementRow) -> AppResult<Movement> {
    let movement_type = MovementType::from_str(&row.1)
        .ok_or_else(|| AppError::InternalError(anyhow!("unknown movement type '{}'", row.1)))?;

    Ok(Movement {
        id: row.0,
        movement_type,
        source_warehouse_id: row.2,
        dest_warehouse_id: row.3,
        reference_type: row.4,
        reference_id: row.5,
        note: row.6,
        created_at: row.7,
    })
}

type LineRow = (Uuid, Uuid, Uuid, Option<Uuid>, Option<Uuid>, Decimal, i16);

fn line_from_row(row: LineRow) -> AppResult<MovementLine> {
    let effect = MovementEffect::from_code(row.6)
        .ok_or_else(|| AppError::InternalError(anyhow!("unknown movement effect '{}'", row.6)))?;

    Ok(MovementLine {
        id: row.0,
        movement_id: row.1,
        product_id: row.2,
        lot_id: row.3,
        warehouse_id: row.4,
        quantity: row.5,
        effect,
    })
}

/// Read access to the movement log
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
}

impl MovementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a movement with its lines
    pub async fn get_movement(&self, movement_id: Uuid) -> AppResult<MovementWithLines> {
        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, movement_type, source_warehouse_id, dest_warehouse_id,
                   reference_type, reference_id, note, created_at
            FROM movements
            WHERE id = $1
            "#,
        )
        .bind(movement_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;

        let movement = movement_from_row(row)?;

        let lines = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT id, movement_id, product_id, lot_id, warehouse_id, quantity, effect
            FROM movement_lines
            WHERE movement_id = $1
            ORDER BY id
            "#,
        )
        .bind(movement_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(line_from_row)
        .collect::<AppResult<Vec<_>>>()?;

        Ok(MovementWithLines { movement, lines })
    }

    /// List movements carrying a given reference, oldest first
    pub async fn list_by_reference(
        &self,
        reference_type: &str,
        reference_id: &str,
    ) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, movement_type, source_warehouse_id, dest_warehouse_id,
                   reference_type, reference_id, note, created_at
            FROM movements
            WHERE reference_type = $1 AND reference_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(reference_type)
        .bind(reference_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(movement_from_row).collect()
    }
}
