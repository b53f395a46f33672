//! Common types used across the platform

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fractional digits carried by every ledger quantity.
///
/// All quantities are fixed-point decimals stored as NUMERIC(14,4); inputs
/// with finer resolution are rejected rather than silently rounded.
pub const QTY_SCALE: u32 = 4;

/// Round a computed quantity (e.g. a fractionation factor product) to the
/// ledger scale.
pub fn round_qty(qty: Decimal) -> Decimal {
    qty.round_dp(QTY_SCALE)
}

/// True if the quantity carries no more than [`QTY_SCALE`] fractional digits.
pub fn fits_qty_scale(qty: Decimal) -> bool {
    qty == qty.round_dp(QTY_SCALE)
}

/// What to do when a sale requests more than the eligible supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShortfallPolicy {
    /// Apply what is available and queue the remainder as a pending
    /// consumption (the historical behavior).
    #[default]
    Queue,
    /// Roll the whole consumption back with a validation error.
    Fail,
}

/// How concurrent consumers pick lots.
///
/// `FifoSkipLocked` is the only implemented policy: candidates are ordered
/// oldest-origin-first, but rows locked by a concurrent transaction are
/// skipped rather than waited on. FIFO is therefore exact within one
/// operation and best-effort across concurrent operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionOrdering {
    FifoSkipLocked,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_qty_to_scale() {
        let q = Decimal::from_str("1.23456").unwrap();
        assert_eq!(round_qty(q), Decimal::from_str("1.2346").unwrap());
    }

    #[test]
    fn test_fits_qty_scale() {
        assert!(fits_qty_scale(Decimal::from_str("10.5000").unwrap()));
        assert!(fits_qty_scale(Decimal::from_str("10.1234").unwrap()));
        assert!(!fits_qty_scale(Decimal::from_str("10.12345").unwrap()));
    }

    #[test]
    fn test_shortfall_policy_default() {
        assert_eq!(ShortfallPolicy::default(), ShortfallPolicy::Queue);
    }
}
