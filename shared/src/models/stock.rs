//! Stock aggregate and pending consumption models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Denormalized current total for one (product, warehouse) pair.
///
/// Invariant: equals the sum of allocation availability for the pair at
/// all times; maintained incrementally, never recomputed on the hot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAggregate {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Stock query response
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    pub product_id: Uuid,
    /// None means the total across all warehouses
    pub warehouse_id: Option<Uuid>,
    pub quantity: Decimal,
}

/// One row of the start-of-day snapshot
#[derive(Debug, Clone, Serialize)]
pub struct StockSnapshotRow {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
}

/// A queued, not-yet-applied consumption request.
///
/// Created when a sale requests more than the eligible supply; shrunk or
/// deleted when replayed against new supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConsumption {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub quantity: Decimal,
    pub sale_ref: Option<String>,
    pub unit_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}
