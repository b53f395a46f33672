//! Supplier receipt models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A supplier receipt header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub receipt_date: NaiveDate,
    pub supplier_ref: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One line of a supplier receipt
///
/// The line total is split into two quality grades; the storage layer
/// enforces that the grades sum to the total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub product_id: Uuid,
    pub unit: String,
    pub quantity: Decimal,
    pub quantity_grade_a: Decimal,
    pub quantity_grade_b: Decimal,
    pub billing_entity: String,
}

/// Input for registering a receipt
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterReceiptInput {
    pub receipt_date: NaiveDate,
    #[validate(length(min = 1, max = 64))]
    pub supplier_ref: String,
    pub note: Option<String>,
    /// Warehouse every new lot is seeded into
    pub warehouse_id: Uuid,
    #[validate(length(min = 1))]
    pub lines: Vec<ReceiptLineInput>,
}

/// Input for one receipt line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLineInput {
    pub product_id: Uuid,
    pub unit: String,
    pub quantity: Decimal,
    pub quantity_grade_a: Decimal,
    pub quantity_grade_b: Decimal,
    pub billing_entity: String,
}

/// Input for editing a receipt note (the only mutable header field)
#[derive(Debug, Deserialize)]
pub struct UpdateReceiptNoteInput {
    pub note: Option<String>,
}
