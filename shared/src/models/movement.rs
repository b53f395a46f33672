//! Movement log models
//!
//! Every ledger-affecting operation appends one Movement header and one
//! line per lot effect. Both are immutable once written.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Movement types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Inbound,
    Transfer,
    Sale,
    Shrinkage,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inbound => "inbound",
            MovementType::Transfer => "transfer",
            MovementType::Sale => "sale",
            MovementType::Shrinkage => "shrinkage",
            MovementType::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(MovementType::Inbound),
            "transfer" => Some(MovementType::Transfer),
            "sale" => Some(MovementType::Sale),
            "shrinkage" => Some(MovementType::Shrinkage),
            "adjustment" => Some(MovementType::Adjustment),
            _ => None,
        }
    }
}

/// Signed effect of a movement line, stored as +1 / -1 next to an
/// unsigned quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementEffect {
    Entry,
    Exit,
}

impl MovementEffect {
    pub fn code(&self) -> i16 {
        match self {
            MovementEffect::Entry => 1,
            MovementEffect::Exit => -1,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(MovementEffect::Entry),
            -1 => Some(MovementEffect::Exit),
            _ => None,
        }
    }
}

/// Movement header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub source_warehouse_id: Option<Uuid>,
    pub dest_warehouse_id: Option<Uuid>,
    /// Free-form reference used as an idempotency key
    /// (e.g. "sale" + the sale id)
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Movement line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementLine {
    pub id: Uuid,
    pub movement_id: Uuid,
    pub product_id: Uuid,
    /// Null only for non-lot-tracked categories
    pub lot_id: Option<Uuid>,
    /// Warehouse the effect lands on
    pub warehouse_id: Option<Uuid>,
    pub quantity: Decimal,
    pub effect: MovementEffect,
}

impl MovementLine {
    /// Signed contribution of this line to a stock total.
    pub fn signed_quantity(&self) -> Decimal {
        self.quantity * Decimal::from(self.effect.code())
    }
}

/// A movement header together with its lines
#[derive(Debug, Clone, Serialize)]
pub struct MovementWithLines {
    #[serde(flatten)]
    pub movement: Movement,
    pub lines: Vec<MovementLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_movement_type_round_trip() {
        for t in [
            MovementType::Inbound,
            MovementType::Transfer,
            MovementType::Sale,
            MovementType::Shrinkage,
            MovementType::Adjustment,
        ] {
            assert_eq!(MovementType::from_str(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_effect_codes() {
        assert_eq!(MovementEffect::Entry.code(), 1);
        assert_eq!(MovementEffect::Exit.code(), -1);
        assert_eq!(MovementEffect::from_code(0), None);
    }

    #[test]
    fn test_signed_quantity() {
        let line = MovementLine {
            id: Uuid::new_v4(),
            movement_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            lot_id: None,
            warehouse_id: None,
            quantity: Decimal::from_str("12.5").unwrap(),
            effect: MovementEffect::Exit,
        };
        assert_eq!(line.signed_quantity(), Decimal::from_str("-12.5").unwrap());
    }
}
