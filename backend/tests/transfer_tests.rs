//! Transfer engine tests
//!
//! Transfers reuse the FIFO planning core scoped to the source
//! warehouse; these tests cover line validation, the all-or-nothing
//! batch rule at the planning level, and the symmetry of the warehouse
//! deltas a transfer produces.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use stock_ledger_backend::services::consumption::{plan_fifo, LotCandidate};
use stock_ledger_backend::services::transfer::{validate_line, TransferLineInput};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(quantity: &str, source: Uuid, dest: Uuid) -> TransferLineInput {
    TransferLineInput {
        product_id: Uuid::new_v4(),
        quantity: dec(quantity),
        source_warehouse_id: source,
        dest_warehouse_id: dest,
    }
}

fn source_candidate(warehouse_id: Uuid, available: &str) -> LotCandidate {
    LotCandidate {
        lot_id: Uuid::new_v4(),
        allocation_id: Uuid::new_v4(),
        warehouse_id,
        lot_available: dec(available),
        allocation_available: dec(available),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_validate_line_accepts_distinct_warehouses() {
        let l = line("30", Uuid::new_v4(), Uuid::new_v4());
        assert!(validate_line(&l).is_ok());
    }

    #[test]
    fn test_validate_line_rejects_identical_warehouses() {
        let warehouse = Uuid::new_v4();
        let l = line("30", warehouse, warehouse);
        assert!(validate_line(&l).is_err());
    }

    #[test]
    fn test_validate_line_rejects_non_positive_quantity() {
        let l = line("0", Uuid::new_v4(), Uuid::new_v4());
        assert!(validate_line(&l).is_err());

        let l = line("-5", Uuid::new_v4(), Uuid::new_v4());
        assert!(validate_line(&l).is_err());
    }

    /// A line whose request exceeds source supply plans with a shortfall,
    /// which fails the whole batch
    #[test]
    fn test_insufficient_source_supply_is_detected() {
        let source = Uuid::new_v4();
        let candidates = vec![
            source_candidate(source, "20"),
            source_candidate(source, "15"),
        ];
        let plan = plan_fifo(&candidates, dec("50"));

        assert_eq!(plan.applied, dec("35"));
        assert!(plan.shortfall > Decimal::ZERO);
    }

    /// A covered line plans exactly the requested quantity, oldest lot
    /// first, preserving lot identity per take
    #[test]
    fn test_covered_line_plans_fully() {
        let source = Uuid::new_v4();
        let first = source_candidate(source, "60");
        let second = source_candidate(source, "40");
        let plan = plan_fifo(&[first.clone(), second.clone()], dec("70"));

        assert_eq!(plan.shortfall, Decimal::ZERO);
        assert_eq!(plan.takes.len(), 2);
        assert_eq!(plan.takes[0].lot_id, first.lot_id);
        assert_eq!(plan.takes[1].lot_id, second.lot_id);
        let moved: Decimal = plan.takes.iter().map(|t| t.quantity).sum();
        assert_eq!(moved, dec("70"));
    }

    /// Scenario: 30 of 100 transferred leaves 70 at the source and 30 at
    /// the destination, total unchanged
    #[test]
    fn test_transfer_scenario_deltas() {
        let source = Uuid::new_v4();
        let candidates = vec![source_candidate(source, "100")];
        let plan = plan_fifo(&candidates, dec("30"));

        let moved: Decimal = plan.takes.iter().map(|t| t.quantity).sum();
        let source_after = dec("100") - moved;
        let dest_after = moved;

        assert_eq!(source_after, dec("70"));
        assert_eq!(dest_after, dec("30"));
        assert_eq!(source_after + dest_after, dec("100"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every covered transfer moves exactly the requested quantity:
        /// the source loses what the destination gains
        #[test]
        fn prop_transfer_conserves_total(
            availabilities in prop::collection::vec(quantity_strategy(), 1..8)
        ) {
            let source = Uuid::new_v4();
            let candidates: Vec<LotCandidate> = availabilities
                .iter()
                .map(|a| LotCandidate {
                    lot_id: Uuid::new_v4(),
                    allocation_id: Uuid::new_v4(),
                    warehouse_id: source,
                    lot_available: *a,
                    allocation_available: *a,
                })
                .collect();

            let supply: Decimal = availabilities.iter().sum();
            let plan = plan_fifo(&candidates, supply);

            prop_assert_eq!(plan.shortfall, Decimal::ZERO);
            let moved: Decimal = plan.takes.iter().map(|t| t.quantity).sum();
            prop_assert_eq!(moved, supply);
        }

        /// The batch rule: any shortfall means the request exceeded the
        /// visible source supply
        #[test]
        fn prop_shortfall_iff_undersupplied(
            availabilities in prop::collection::vec(quantity_strategy(), 0..8),
            requested in quantity_strategy()
        ) {
            let source = Uuid::new_v4();
            let candidates: Vec<LotCandidate> = availabilities
                .iter()
                .map(|a| LotCandidate {
                    lot_id: Uuid::new_v4(),
                    allocation_id: Uuid::new_v4(),
                    warehouse_id: source,
                    lot_available: *a,
                    allocation_available: *a,
                })
                .collect();

            let supply: Decimal = availabilities.iter().sum();
            let plan = plan_fifo(&candidates, requested);

            if requested <= supply {
                prop_assert_eq!(plan.shortfall, Decimal::ZERO);
            } else {
                prop_assert_eq!(plan.shortfall, requested - supply);
            }
        }
    }
}
