//! Stock aggregate maintainer and stock read surface.
//!
//! `apply_stock_delta` is the single funnel through which every engine
//! mutates the per-product-per-warehouse total. It runs on the caller's
//! connection, so the aggregate commits atomically with the lot and
//! allocation rows that motivated it. The aggregate is never recomputed
//! from allocations on the hot path.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::{StockLevel, StockSnapshotRow};

use crate::error::AppResult;

/// Create-or-increment the aggregate row for (product, warehouse).
///
/// A delta that would drive the total negative trips the table's check
/// constraint and aborts the enclosing transaction.
pub(crate) async fn apply_stock_delta(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Uuid,
    delta: Decimal,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_aggregates (product_id, warehouse_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (product_id, warehouse_id)
        DO UPDATE SET quantity = stock_aggregates.quantity + EXCLUDED.quantity,
                      updated_at = NOW()
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .bind(delta)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Accumulates per-(product, warehouse) deltas during a multi-lot
/// operation so the aggregate primitive runs exactly once per pair.
#[derive(Default)]
pub(crate) struct StockDeltas {
    deltas: HashMap<(Uuid, Uuid), Decimal>,
}

impl StockDeltas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product_id: Uuid, warehouse_id: Uuid, delta: Decimal) {
        *self
            .deltas
            .entry((product_id, warehouse_id))
            .or_insert(Decimal::ZERO) += delta;
    }

    pub async fn apply(self, conn: &mut PgConnection) -> AppResult<()> {
        for ((product_id, warehouse_id), delta) in self.deltas {
            if delta != Decimal::ZERO {
                apply_stock_delta(conn, product_id, warehouse_id, delta).await?;
            }
        }
        Ok(())
    }
}

/// Stock read surface
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Current stock of a product, in one warehouse or across all of them
    pub async fn get_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<StockLevel> {
        let quantity = match warehouse_id {
            Some(warehouse_id) => {
                sqlx::query_scalar::<_, Option<Decimal>>(
                    "SELECT quantity FROM stock_aggregates WHERE product_id = $1 AND warehouse_id = $2",
                )
                .bind(product_id)
                .bind(warehouse_id)
                .fetch_optional(&self.db)
                .await?
                .flatten()
                .unwrap_or(Decimal::ZERO)
            }
            None => sqlx::query_scalar::<_, Option<Decimal>>(
                "SELECT SUM(quantity) FROM stock_aggregates WHERE product_id = $1",
            )
            .bind(product_id)
            .fetch_one(&self.db)
            .await?
            .unwrap_or(Decimal::ZERO),
        };

        Ok(StockLevel {
            product_id,
            warehouse_id,
            quantity,
        })
    }

    /// Per-product per-warehouse quantities at the start of `day`:
    /// the current aggregate minus the signed movement effects recorded
    /// since that day began. Read-only; consumed by the daily-snapshot
    /// collaborator.
    pub async fn initial_snapshot(&self, day: NaiveDate) -> AppResult<Vec<StockSnapshotRow>> {
        let day_start = day.and_time(NaiveTime::MIN).and_utc();

        let rows = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
            r#"
            SELECT sa.product_id, sa.warehouse_id,
                   sa.quantity - COALESCE(m.delta, 0) AS quantity
            FROM stock_aggregates sa
            LEFT JOIN (
                SELECT ml.product_id, ml.warehouse_id,
                       SUM(ml.quantity * ml.effect) AS delta
                FROM movement_lines ml
                JOIN movements mv ON mv.id = ml.movement_id
                WHERE mv.created_at >= $1 AND ml.warehouse_id IS NOT NULL
                GROUP BY ml.product_id, ml.warehouse_id
            ) m ON m.product_id = sa.product_id AND m.warehouse_id = sa.warehouse_id
            ORDER BY sa.product_id, sa.warehouse_id
            "#,
        )
        .bind(day_start)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, warehouse_id, quantity)| StockSnapshotRow {
                product_id,
                warehouse_id,
                quantity,
            })
            .collect())
    }
}
