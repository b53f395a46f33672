//! Receipt intake tests
//!
//! Covers the grade split: one lot per positive grade quantity, split-sum
//! validation, and quantity conservation from line to lots.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{validation, LotClass, ReceiptLineInput};
use stock_ledger_backend::services::receipt::grade_lots;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(total: &str, grade_a: &str, grade_b: &str) -> ReceiptLineInput {
    ReceiptLineInput {
        product_id: Uuid::new_v4(),
        unit: "kg".to_string(),
        quantity: dec(total),
        quantity_grade_a: dec(grade_a),
        quantity_grade_b: dec(grade_b),
        billing_entity: "main".to_string(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A 60/40 split yields one lot per grade
    #[test]
    fn test_two_grades_two_lots() {
        let lots = grade_lots(&line("100", "60", "40"));

        assert_eq!(lots.len(), 2);
        assert_eq!(lots[0], (LotClass::GradeA, dec("60")));
        assert_eq!(lots[1], (LotClass::GradeB, dec("40")));
    }

    /// A zero grade produces no lot
    #[test]
    fn test_single_grade_single_lot() {
        let lots = grade_lots(&line("100", "100", "0"));
        assert_eq!(lots, vec![(LotClass::GradeA, dec("100"))]);

        let lots = grade_lots(&line("100", "0", "100"));
        assert_eq!(lots, vec![(LotClass::GradeB, dec("100"))]);
    }

    #[test]
    fn test_split_must_sum_to_total() {
        assert!(validation::validate_grade_split(dec("100"), dec("60"), dec("40")).is_ok());
        assert!(validation::validate_grade_split(dec("100"), dec("60"), dec("50")).is_err());
        assert!(validation::validate_grade_split(dec("100"), dec("110"), dec("-10")).is_err());
    }

    /// Scenario: a receipt of 100 split 60/40 seeds 100 units of stock
    #[test]
    fn test_receipt_scenario_stock_total() {
        let lots = grade_lots(&line("100", "60", "40"));
        let seeded: Decimal = lots.iter().map(|(_, q)| *q).sum();
        assert_eq!(seeded, dec("100"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Lots conserve the line total whenever the split is valid
        #[test]
        fn prop_lots_conserve_line_total(
            grade_a in quantity_strategy(),
            grade_b in quantity_strategy()
        ) {
            let total = grade_a + grade_b;
            if total == Decimal::ZERO {
                return Ok(());
            }

            let input = ReceiptLineInput {
                product_id: Uuid::new_v4(),
                unit: "kg".to_string(),
                quantity: total,
                quantity_grade_a: grade_a,
                quantity_grade_b: grade_b,
                billing_entity: "main".to_string(),
            };
            prop_assert!(validation::validate_grade_split(total, grade_a, grade_b).is_ok());

            let lots = grade_lots(&input);
            let seeded: Decimal = lots.iter().map(|(_, q)| *q).sum();
            prop_assert_eq!(seeded, total);

            // One lot per positive grade, never more
            let expected =
                usize::from(grade_a > Decimal::ZERO) + usize::from(grade_b > Decimal::ZERO);
            prop_assert_eq!(lots.len(), expected);
        }

        /// A broken split is always rejected
        #[test]
        fn prop_broken_split_rejected(
            grade_a in quantity_strategy(),
            grade_b in quantity_strategy(),
            excess in (1i64..=1000i64).prop_map(|n| Decimal::new(n, 1))
        ) {
            let total = grade_a + grade_b + excess;
            prop_assert!(validation::validate_grade_split(total, grade_a, grade_b).is_err());
        }
    }
}
