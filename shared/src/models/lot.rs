//! Lot and per-warehouse allocation models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of lot classes, stored as a small-integer code.
///
/// Historically a free-form tag; the codes are now fixed and decoding an
/// unknown code is an error rather than a new category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotClass {
    /// First-quality portion of a receipt line
    GradeA,
    /// Second-quality portion of a receipt line
    GradeB,
    /// Produced by fractionating another lot
    Derived,
}

impl LotClass {
    pub fn code(&self) -> i16 {
        match self {
            LotClass::GradeA => 1,
            LotClass::GradeB => 2,
            LotClass::Derived => 3,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(LotClass::GradeA),
            2 => Some(LotClass::GradeB),
            3 => Some(LotClass::Derived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LotClass::GradeA => "grade_a",
            LotClass::GradeB => "grade_b",
            LotClass::Derived => "derived",
        }
    }
}

/// The atomic unit of inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    /// Originating receipt line (restrict-delete ownership link)
    pub receipt_line_id: Uuid,
    pub product_id: Uuid,
    /// FIFO sort key, inherited from the receipt date
    pub origin_date: NaiveDate,
    pub lot_class: LotClass,
    pub initial_qty: Decimal,
    /// Quantity still available across all warehouses
    pub available_qty: Decimal,
    /// Blocked lots are excluded from consumption, transfer and
    /// fractionation even while available_qty is positive.
    pub blocked: bool,
    /// Insertion order, tie-break for lots sharing an origin date
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

/// The portion of a lot assigned to one warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotAllocation {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub warehouse_id: Uuid,
    /// Cumulative quantity routed into this warehouse for this lot
    pub assigned_qty: Decimal,
    /// Quantity currently available in this warehouse
    pub available_qty: Decimal,
}

/// A lot together with its warehouse allocations
#[derive(Debug, Clone, Serialize)]
pub struct LotWithAllocations {
    #[serde(flatten)]
    pub lot: Lot,
    pub allocations: Vec<LotAllocation>,
}

/// Input for toggling the manual block flag
#[derive(Debug, Deserialize)]
pub struct SetLotBlockedInput {
    pub blocked: bool,
}
