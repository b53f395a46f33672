//! Lot store access: row reads and the manual block flag.
//!
//! Quantity mutations never happen here; they belong to the intake,
//! consumption, transfer and fractionation engines.

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{Lot, LotAllocation, LotClass, LotWithAllocations};

use crate::error::{AppError, AppResult};

pub(crate) type LotRow = (
    Uuid,
    Uuid,
    Uuid,
    NaiveDate,
    i16,
    Decimal,
    Decimal,
    bool,
    i64,
    DateTime<Utc>,
);

pub(crate) const LOT_COLUMNS: &str = "id, receipt_line_id, product_id, origin_date, lot_class, \
     initial_qty, available_qty, blocked, seq, created_at";

pub(crate) fn lot_from_row(row: LotRow) -> AppResult<Lot> {
    let lot_class = LotClass::from_code(row.4)
        .ok_or_else(|| AppError::InternalError(anyhow!("unknown lot class code {}", row.4)))?;

    Ok(Lot {
        id: row.0,
        receipt_line_id: row.1,
        product_id: row.2,
        origin_date: row.3,
        lot_class,
        initial_qty: row.5,
        available_qty: row.6,
        blocked: row.7,
        seq: row.8,
        created_at: row.9,
    })
}

type AllocationRow = (Uuid, Uuid, Uuid, Decimal, Decimal);

fn allocation_from_row(row: AllocationRow) -> LotAllocation {
    LotAllocation {
        id: row.0,
        lot_id: row.1,
        warehouse_id: row.2,
        assigned_qty: row.3,
        available_qty: row.4,
    }
}

/// Lot store service
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

impl LotService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a lot with its warehouse allocations
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<LotWithAllocations> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM lots WHERE id = $1",
            LOT_COLUMNS
        ))
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        let lot = lot_from_row(row)?;

        let allocations = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, lot_id, warehouse_id, assigned_qty, available_qty
            FROM lot_warehouse_allocations
            WHERE lot_id = $1
            ORDER BY warehouse_id
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(allocation_from_row)
        .collect();

        Ok(LotWithAllocations { lot, allocations })
    }

    /// List lots of a product, FIFO order
    pub async fn list_by_product(&self, product_id: Uuid) -> AppResult<Vec<Lot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "SELECT {} FROM lots WHERE product_id = $1 ORDER BY origin_date ASC, seq ASC",
            LOT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(lot_from_row).collect()
    }

    /// Set the manual block flag. Blocked lots are excluded from
    /// consumption, transfer and fractionation eligibility.
    pub async fn set_blocked(&self, lot_id: Uuid, blocked: bool) -> AppResult<Lot> {
        let row = sqlx::query_as::<_, LotRow>(&format!(
            "UPDATE lots SET blocked = $1 WHERE id = $2 RETURNING {}",
            LOT_COLUMNS
        ))
        .bind(blocked)
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        lot_from_row(row)
    }
}
