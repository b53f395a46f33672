//! FIFO consumption engine tests
//!
//! Covers the planning core shared by consumption and transfer:
//! - FIFO order (oldest candidate drained first)
//! - Conservation (applied + shortfall == requested)
//! - Per-lot and per-allocation caps
//! - Partial-fulfillment arithmetic

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::ConsumptionOrdering;
use stock_ledger_backend::services::consumption::{plan_fifo, ConsumptionService, LotCandidate};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn candidate(lot_available: &str, allocation_available: &str) -> LotCandidate {
    LotCandidate {
        lot_id: Uuid::new_v4(),
        allocation_id: Uuid::new_v4(),
        warehouse_id: Uuid::new_v4(),
        lot_available: dec(lot_available),
        allocation_available: dec(allocation_available),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The engine's lot-picking policy is the documented one
    #[test]
    fn test_consumption_ordering_policy() {
        assert_eq!(
            ConsumptionService::ORDERING,
            ConsumptionOrdering::FifoSkipLocked
        );
    }

    /// A request covered by the oldest lot draws exclusively from it
    #[test]
    fn test_fifo_draws_from_oldest_only() {
        let older = candidate("100", "100");
        let newer = candidate("100", "100");
        let plan = plan_fifo(&[older.clone(), newer], dec("60"));

        assert_eq!(plan.takes.len(), 1);
        assert_eq!(plan.takes[0].lot_id, older.lot_id);
        assert_eq!(plan.takes[0].quantity, dec("60"));
        assert_eq!(plan.applied, dec("60"));
        assert_eq!(plan.shortfall, Decimal::ZERO);
    }

    /// A larger request spans lots in candidate order
    #[test]
    fn test_fifo_spans_lots_in_order() {
        let first = candidate("60", "60");
        let second = candidate("40", "40");
        let plan = plan_fifo(&[first.clone(), second.clone()], dec("90"));

        assert_eq!(plan.takes.len(), 2);
        assert_eq!(plan.takes[0].lot_id, first.lot_id);
        assert_eq!(plan.takes[0].quantity, dec("60"));
        assert_eq!(plan.takes[1].lot_id, second.lot_id);
        assert_eq!(plan.takes[1].quantity, dec("30"));
        assert_eq!(plan.applied, dec("90"));
    }

    /// Shortfall is reported, not an error, at the planning level
    #[test]
    fn test_partial_fulfillment() {
        let only = candidate("50", "50");
        let plan = plan_fifo(&[only], dec("80"));

        assert_eq!(plan.applied, dec("50"));
        assert_eq!(plan.shortfall, dec("30"));
    }

    /// No eligible supply leaves the whole request unfulfilled
    #[test]
    fn test_no_candidates() {
        let plan = plan_fifo(&[], dec("25"));

        assert!(plan.takes.is_empty());
        assert_eq!(plan.applied, Decimal::ZERO);
        assert_eq!(plan.shortfall, dec("25"));
    }

    /// A lot split across warehouses never yields more than its global
    /// availability
    #[test]
    fn test_global_availability_caps_split_lot() {
        let lot_id = Uuid::new_v4();
        let first = LotCandidate {
            lot_id,
            allocation_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            lot_available: dec("50"),
            allocation_available: dec("40"),
        };
        let second = LotCandidate {
            lot_id,
            allocation_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            lot_available: dec("50"),
            allocation_available: dec("40"),
        };

        let plan = plan_fifo(&[first, second], dec("80"));

        let total: Decimal = plan.takes.iter().map(|t| t.quantity).sum();
        assert_eq!(total, dec("50"));
        assert_eq!(plan.applied, dec("50"));
        assert_eq!(plan.shortfall, dec("30"));
    }

    /// Scenario: 100 received, 50 consumed, then 80 requested
    #[test]
    fn test_receipt_consume_consume_scenario() {
        let lot = candidate("100", "100");
        let first = plan_fifo(&[lot.clone()], dec("50"));
        assert_eq!(first.applied, dec("50"));

        let remaining = LotCandidate {
            lot_available: dec("50"),
            allocation_available: dec("50"),
            ..lot
        };
        let second = plan_fifo(&[remaining], dec("80"));
        assert_eq!(second.applied, dec("50"));
        assert_eq!(second.shortfall, dec("30"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating availabilities (0.1 to 1000.0)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1))
    }

    /// Strategy for candidate lists with distinct lots
    fn candidates_strategy() -> impl Strategy<Value = Vec<LotCandidate>> {
        prop::collection::vec(quantity_strategy(), 0..10).prop_map(|availabilities| {
            availabilities
                .into_iter()
                .map(|available| LotCandidate {
                    lot_id: Uuid::new_v4(),
                    allocation_id: Uuid::new_v4(),
                    warehouse_id: Uuid::new_v4(),
                    lot_available: available,
                    allocation_available: available,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Applied plus shortfall always equals the request
        #[test]
        fn prop_conservation(
            candidates in candidates_strategy(),
            requested in quantity_strategy()
        ) {
            let plan = plan_fifo(&candidates, requested);

            prop_assert_eq!(plan.applied + plan.shortfall, requested);
            prop_assert!(plan.applied >= Decimal::ZERO);
            prop_assert!(plan.shortfall >= Decimal::ZERO);
        }

        /// Takes never exceed any candidate's allocation availability
        #[test]
        fn prop_takes_within_allocation_caps(
            candidates in candidates_strategy(),
            requested in quantity_strategy()
        ) {
            let plan = plan_fifo(&candidates, requested);

            for take in &plan.takes {
                let candidate = candidates
                    .iter()
                    .find(|c| c.allocation_id == take.allocation_id)
                    .unwrap();
                prop_assert!(take.quantity > Decimal::ZERO);
                prop_assert!(take.quantity <= candidate.allocation_available);
            }
        }

        /// The applied total never exceeds the eligible supply
        #[test]
        fn prop_applied_bounded_by_supply(
            candidates in candidates_strategy(),
            requested in quantity_strategy()
        ) {
            let supply: Decimal = candidates.iter().map(|c| c.allocation_available).sum();
            let plan = plan_fifo(&candidates, requested);

            prop_assert!(plan.applied <= supply);
            prop_assert!(plan.applied <= requested);
        }

        /// A request covered by the first candidate touches nothing else
        #[test]
        fn prop_fifo_exclusivity(candidates in candidates_strategy()) {
            if let Some(first) = candidates.first() {
                let plan = plan_fifo(&candidates, first.allocation_available);

                prop_assert_eq!(plan.takes.len(), 1);
                prop_assert_eq!(plan.takes[0].lot_id, first.lot_id);
                prop_assert_eq!(plan.shortfall, Decimal::ZERO);
            }
        }

        /// Planning is deterministic
        #[test]
        fn prop_plan_deterministic(
            candidates in candidates_strategy(),
            requested in quantity_strategy()
        ) {
            let a = plan_fifo(&candidates, requested);
            let b = plan_fifo(&candidates, requested);

            prop_assert_eq!(a.takes, b.takes);
            prop_assert_eq!(a.applied, b.applied);
            prop_assert_eq!(a.shortfall, b.shortfall);
        }
    }
}
