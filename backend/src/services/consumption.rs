//! FIFO consumption engine.
//!
//! Allocates a requested quantity of a product across eligible lots
//! oldest-origin-first, decrementing both the lot's global availability
//! and the availability of the warehouse allocation each take lands on.
//!
//! Candidate rows are locked with `FOR UPDATE SKIP LOCKED`: two
//! concurrent consumptions of the same product do not block each other,
//! each falls through to the next unlocked eligible lot. FIFO is
//! therefore exact within one operation and best-effort across
//! concurrent operations ([`ConsumptionOrdering::FifoSkipLocked`]).

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use serde::{Deserialize, Serialize};
use shared::{
    validation, ConsumptionOrdering, MovementEffect, MovementType, PendingConsumption,
    ShortfallPolicy,
};

use crate::error::{AppError, AppResult};
use crate::services::movement::{self, NewMovement};
use crate::services::stock::StockDeltas;
use crate::services::{product, warehouse};

/// Reference type recorded on sale movements; doubles as the idempotency
/// key space for `sale_ref`.
pub const SALE_REFERENCE: &str = "sale";

/// Reference type recorded when a queued shortfall is replayed without a
/// sale reference of its own.
pub const PENDING_REFERENCE: &str = "pending_replay";

/// One lockable (lot, warehouse allocation) pair, in FIFO order.
#[derive(Debug, Clone)]
pub struct LotCandidate {
    pub lot_id: Uuid,
    pub allocation_id: Uuid,
    pub warehouse_id: Uuid,
    pub lot_available: Decimal,
    pub allocation_available: Decimal,
}

/// One planned decrement against a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotTake {
    pub lot_id: Uuid,
    pub allocation_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
}

/// The outcome of planning a request against a candidate list.
#[derive(Debug, Clone)]
pub struct FifoPlan {
    pub takes: Vec<LotTake>,
    pub applied: Decimal,
    pub shortfall: Decimal,
}

/// Plan FIFO takes over candidates already sorted oldest-first.
///
/// A lot allocated across several warehouses appears once per
/// allocation; the plan never draws more than the lot's global
/// availability across all of them.
pub fn plan_fifo(candidates: &[LotCandidate], requested: Decimal) -> FifoPlan {
    let mut remaining = requested;
    let mut takes = Vec::new();
    let mut taken_per_lot: HashMap<Uuid, Decimal> = HashMap::new();

    for candidate in candidates {
        if remaining <= Decimal::ZERO {
            break;
        }

        let already_taken = taken_per_lot
            .get(&candidate.lot_id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let lot_headroom = candidate.lot_available - already_taken;
        let take = remaining
            .min(candidate.allocation_available)
            .min(lot_headroom);

        if take <= Decimal::ZERO {
            continue;
        }

        takes.push(LotTake {
            lot_id: candidate.lot_id,
            allocation_id: candidate.allocation_id,
            warehouse_id: candidate.warehouse_id,
            quantity: take,
        });
        *taken_per_lot
            .entry(candidate.lot_id)
            .or_insert(Decimal::ZERO) += take;
        remaining -= take;
    }

    FifoPlan {
        takes,
        applied: requested - remaining,
        shortfall: remaining,
    }
}

/// Lock eligible (lot, allocation) pairs for a product, FIFO order,
/// skipping rows already locked by concurrent operations.
pub(crate) async fn lock_candidates(
    conn: &mut PgConnection,
    product_id: Uuid,
    warehouse_id: Option<Uuid>,
) -> AppResult<Vec<LotCandidate>> {
    let rows = sqlx::query_as::<_, (Uuid, Decimal, Uuid, Uuid, Decimal)>(
        r#"
        SELECT l.id, l.available_qty, a.id, a.warehouse_id, a.available_qty
        FROM lots l
        JOIN lot_warehouse_allocations a ON a.lot_id = l.id
        WHERE l.product_id = $1
          AND NOT l.blocked
          AND l.available_qty > 0
          AND a.available_qty > 0
          AND ($2::uuid IS NULL OR a.warehouse_id = $2)
        ORDER BY l.origin_date ASC, l.seq ASC
        FOR UPDATE OF l, a SKIP LOCKED
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(lot_id, lot_available, allocation_id, warehouse_id, allocation_available)| {
                LotCandidate {
                    lot_id,
                    allocation_id,
                    warehouse_id,
                    lot_available,
                    allocation_available,
                }
            },
        )
        .collect())
}

/// Apply one planned take: decrement the lot, its allocation, append the
/// movement line and accumulate the aggregate delta.
pub(crate) async fn apply_take(
    conn: &mut PgConnection,
    movement_id: Uuid,
    product_id: Uuid,
    take: &LotTake,
    deltas: &mut StockDeltas,
) -> AppResult<()> {
    sqlx::query("UPDATE lots SET available_qty = available_qty - $1 WHERE id = $2")
        .bind(take.quantity)
        .bind(take.lot_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE lot_warehouse_allocations SET available_qty = available_qty - $1 WHERE id = $2")
        .bind(take.quantity)
        .bind(take.allocation_id)
        .execute(&mut *conn)
        .await?;

    movement::insert_line(
        conn,
        movement_id,
        product_id,
        Some(take.lot_id),
        Some(take.warehouse_id),
        take.quantity,
        MovementEffect::Exit,
    )
    .await?;

    deltas.add(product_id, take.warehouse_id, -take.quantity);
    Ok(())
}

fn default_true() -> bool {
    true
}

/// Input for a sale consumption
#[derive(Debug, Deserialize)]
pub struct ConsumeInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    /// None draws across all warehouses
    pub warehouse_id: Option<Uuid>,
    /// Idempotency key; a repeated reference short-circuits before any
    /// lot is touched
    pub sale_ref: Option<String>,
    pub unit_price: Option<Decimal>,
    /// Disable the duplicate short-circuit for callers that reuse a
    /// reference on purpose
    #[serde(default = "default_true")]
    pub idempotent: bool,
}

/// Result of a sale consumption
#[derive(Debug, Serialize)]
pub struct ConsumeOutcome {
    pub movement_id: Option<Uuid>,
    pub applied: Decimal,
    pub pending: Decimal,
    /// True when the sale reference had already been applied
    pub duplicate: bool,
}

/// Result of replaying queued shortfalls
#[derive(Debug, Serialize)]
pub struct ReplayOutcome {
    pub settled: Decimal,
    pub remaining_requests: i64,
}

/// FIFO consumption engine
#[derive(Clone)]
pub struct ConsumptionService {
    db: PgPool,
    shortfall_policy: ShortfallPolicy,
}

impl ConsumptionService {
    /// The lot-picking policy this engine implements
    pub const ORDERING: ConsumptionOrdering = ConsumptionOrdering::FifoSkipLocked;

    pub fn new(db: PgPool, shortfall_policy: ShortfallPolicy) -> Self {
        Self {
            db,
            shortfall_policy,
        }
    }

    /// Consume a quantity of a product for a sale, oldest lots first.
    ///
    /// When eligible supply runs out the remainder is queued as a
    /// pending consumption (or the operation fails, per the configured
    /// shortfall policy) and the caller is told how much was applied and
    /// how much is pending.
    pub async fn consume_for_sale(&self, input: ConsumeInput) -> AppResult<ConsumeOutcome> {
        validation::validate_quantity(input.quantity).map_err(|message| AppError::Validation {
            field: "quantity".to_string(),
            message: message.to_string(),
        })?;

        // Idempotency: a known sale reference never touches a lot twice.
        if input.idempotent {
            if let Some(sale_ref) = input.sale_ref.as_deref() {
                if let Some(prior) = self.find_prior_outcome(sale_ref).await? {
                    return Ok(prior);
                }
            }
        }

        let mut tx = self.db.begin().await?;

        product::ensure_product(&mut tx, input.product_id).await?;
        if let Some(warehouse_id) = input.warehouse_id {
            warehouse::ensure_warehouse(&mut tx, warehouse_id).await?;
        }

        let candidates = lock_candidates(&mut tx, input.product_id, input.warehouse_id).await?;
        let plan = plan_fifo(&candidates, input.quantity);

        if plan.shortfall > Decimal::ZERO && self.shortfall_policy == ShortfallPolicy::Fail {
            return Err(AppError::InsufficientStock(format!(
                "requested {}, only {} available",
                input.quantity, plan.applied
            )));
        }

        let mut movement_id = None;
        if !plan.takes.is_empty() {
            let id = movement::insert_movement(
                &mut tx,
                &NewMovement {
                    movement_type: MovementType::Sale,
                    source_warehouse_id: input.warehouse_id,
                    dest_warehouse_id: None,
                    reference_type: input.sale_ref.as_deref().map(|_| SALE_REFERENCE),
                    reference_id: input.sale_ref.as_deref(),
                    note: None,
                },
            )
            .await?;

            let mut deltas = StockDeltas::new();
            for take in &plan.takes {
                apply_take(&mut tx, id, input.product_id, take, &mut deltas).await?;
            }
            deltas.apply(&mut tx).await?;
            movement_id = Some(id);
        }

        if plan.shortfall > Decimal::ZERO {
            sqlx::query(
                r#"
                INSERT INTO pending_consumptions (product_id, warehouse_id, quantity, sale_ref, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(input.product_id)
            .bind(input.warehouse_id)
            .bind(plan.shortfall)
            .bind(input.sale_ref.as_deref())
            .bind(input.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(ConsumeOutcome {
            movement_id,
            applied: plan.applied,
            pending: plan.shortfall,
            duplicate: false,
        })
    }

    /// Replay queued shortfalls of a product against current supply,
    /// oldest request first. Fully satisfied requests are deleted;
    /// a partially satisfied one keeps the unmet remainder queued.
    pub async fn replay_pending(&self, product_id: Uuid) -> AppResult<ReplayOutcome> {
        let queued = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM pending_consumptions WHERE product_id = $1 ORDER BY created_at ASC",
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        let mut settled = Decimal::ZERO;
        for (pending_id,) in queued {
            let applied = self.replay_one(product_id, pending_id).await?;
            match applied {
                Some(applied) => settled += applied,
                // Supply exhausted; later requests cannot fare better.
                None => break,
            }
        }

        let remaining_requests = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pending_consumptions WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        Ok(ReplayOutcome {
            settled,
            remaining_requests,
        })
    }

    /// Replay a single pending request. Returns the applied quantity, or
    /// None when no supply was found (the caller stops iterating).
    async fn replay_one(&self, product_id: Uuid, pending_id: Uuid) -> AppResult<Option<Decimal>> {
        let mut tx = self.db.begin().await?;

        // The row may have been settled or claimed by a concurrent replay.
        let Some((quantity, warehouse_id, sale_ref)) =
            sqlx::query_as::<_, (Decimal, Option<Uuid>, Option<String>)>(
                r#"
                SELECT quantity, warehouse_id, sale_ref
                FROM pending_consumptions
                WHERE id = $1
                FOR UPDATE SKIP LOCKED
                "#,
            )
            .bind(pending_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(Some(Decimal::ZERO));
        };

        let candidates = lock_candidates(&mut tx, product_id, warehouse_id).await?;
        let plan = plan_fifo(&candidates, quantity);

        if plan.takes.is_empty() {
            return Ok(None);
        }

        let pending_ref = pending_id.to_string();
        let (reference_type, reference_id) = match sale_ref.as_deref() {
            Some(sale_ref) => (SALE_REFERENCE, sale_ref),
            None => (PENDING_REFERENCE, pending_ref.as_str()),
        };

        let movement_id = movement::insert_movement(
            &mut tx,
            &NewMovement {
                movement_type: MovementType::Sale,
                source_warehouse_id: warehouse_id,
                dest_warehouse_id: None,
                reference_type: Some(reference_type),
                reference_id: Some(reference_id),
                note: None,
            },
        )
        .await?;

        let mut deltas = StockDeltas::new();
        for take in &plan.takes {
            apply_take(&mut tx, movement_id, product_id, take, &mut deltas).await?;
        }
        deltas.apply(&mut tx).await?;

        if plan.shortfall > Decimal::ZERO {
            sqlx::query("UPDATE pending_consumptions SET quantity = $1 WHERE id = $2")
                .bind(plan.shortfall)
                .bind(pending_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query("DELETE FROM pending_consumptions WHERE id = $1")
                .bind(pending_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        if plan.shortfall > Decimal::ZERO {
            // Partial fill means the well is dry.
            return Ok(None);
        }
        Ok(Some(plan.applied))
    }

    /// List queued shortfalls, oldest first
    pub async fn list_pending(&self) -> AppResult<Vec<PendingConsumption>> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                Option<Uuid>,
                Decimal,
                Option<String>,
                Option<Decimal>,
                chrono::DateTime<chrono::Utc>,
            ),
        >(
            r#"
            SELECT id, product_id, warehouse_id, quantity, sale_ref, unit_price, created_at
            FROM pending_consumptions
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, product_id, warehouse_id, quantity, sale_ref, unit_price, created_at)| {
                    PendingConsumption {
                        id,
                        product_id,
                        warehouse_id,
                        quantity,
                        sale_ref,
                        unit_price,
                        created_at,
                    }
                },
            )
            .collect())
    }

    /// Look up what a sale reference already did to the ledger.
    async fn find_prior_outcome(&self, sale_ref: &str) -> AppResult<Option<ConsumeOutcome>> {
        let movement_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM movements
            WHERE movement_type = 'sale' AND reference_type = $1 AND reference_id = $2
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(SALE_REFERENCE)
        .bind(sale_ref)
        .fetch_optional(&self.db)
        .await?;

        let pending = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT SUM(quantity) FROM pending_consumptions WHERE sale_ref = $1",
        )
        .bind(sale_ref)
        .fetch_one(&self.db)
        .await?
        .unwrap_or(Decimal::ZERO);

        if movement_id.is_none() && pending == Decimal::ZERO {
            return Ok(None);
        }

        let applied = sqlx::query_scalar::<_, Option<Decimal>>(
            r#"
            SELECT SUM(ml.quantity)
            FROM movement_lines ml
            JOIN movements m ON m.id = ml.movement_id
            WHERE m.movement_type = 'sale'
              AND m.reference_type = $1
              AND m.reference_id = $2
              AND ml.effect = -1
            "#,
        )
        .bind(SALE_REFERENCE)
        .bind(sale_ref)
        .fetch_one(&self.db)
        .await?
        .unwrap_or(Decimal::ZERO);

        Ok(Some(ConsumeOutcome {
            movement_id,
            applied,
            pending,
            duplicate: true,
        }))
    }
}
