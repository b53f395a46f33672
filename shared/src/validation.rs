//! Validation utilities for the Stock Ledger Platform
//!
//! Pure business-rule checks shared by the intake and movement engines.
//! The storage layer enforces the structural ones again via check
//! constraints.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::types::fits_qty_scale;

/// Validate that a ledger quantity is positive and fits the ledger scale.
pub fn validate_quantity(qty: Decimal) -> Result<(), &'static str> {
    if qty <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    if !fits_qty_scale(qty) {
        return Err("Quantity carries more than 4 fractional digits");
    }
    Ok(())
}

/// Validate that a receipt line's grade split sums to its total quantity.
pub fn validate_grade_split(
    total: Decimal,
    grade_a: Decimal,
    grade_b: Decimal,
) -> Result<(), &'static str> {
    if grade_a < Decimal::ZERO || grade_b < Decimal::ZERO {
        return Err("Grade quantities cannot be negative");
    }
    if grade_a + grade_b != total {
        return Err("Grade quantities must sum to the line total");
    }
    Ok(())
}

/// Validate a transfer line's warehouse pair.
pub fn validate_warehouse_pair(source: Uuid, destination: Uuid) -> Result<(), &'static str> {
    if source == destination {
        return Err("Source and destination warehouse must differ");
    }
    Ok(())
}

/// Validate a fractionation conversion factor.
pub fn validate_factor(factor: Decimal) -> Result<(), &'static str> {
    if factor <= Decimal::ZERO {
        return Err("Conversion factor must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_validate_quantity_positive() {
        assert!(validate_quantity(dec("0.0001")).is_ok());
        assert!(validate_quantity(dec("150.25")).is_ok());
    }

    #[test]
    fn test_validate_quantity_rejects_zero_and_negative() {
        assert!(validate_quantity(Decimal::ZERO).is_err());
        assert!(validate_quantity(dec("-3")).is_err());
    }

    #[test]
    fn test_validate_quantity_rejects_excess_scale() {
        assert!(validate_quantity(dec("1.00001")).is_err());
    }

    #[test]
    fn test_validate_grade_split_valid() {
        assert!(validate_grade_split(dec("100"), dec("60"), dec("40")).is_ok());
        assert!(validate_grade_split(dec("100"), dec("100"), dec("0")).is_ok());
    }

    #[test]
    fn test_validate_grade_split_sum_mismatch() {
        assert!(validate_grade_split(dec("100"), dec("60"), dec("50")).is_err());
    }

    #[test]
    fn test_validate_grade_split_negative() {
        assert!(validate_grade_split(dec("100"), dec("110"), dec("-10")).is_err());
    }

    #[test]
    fn test_validate_warehouse_pair() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_warehouse_pair(a, b).is_ok());
        assert!(validate_warehouse_pair(a, a).is_err());
    }

    #[test]
    fn test_validate_factor() {
        assert!(validate_factor(dec("4")).is_ok());
        assert!(validate_factor(dec("0.5")).is_ok());
        assert!(validate_factor(Decimal::ZERO).is_err());
        assert!(validate_factor(dec("-1")).is_err());
    }
}
