//! Fractionation engine tests
//!
//! Covers destination expansion: explicit amounts, factor conversion
//! with ledger-scale rounding, and rejection of non-positive inputs.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use stock_ledger_backend::services::fractionation::{
    expand_destinations, DestinationAmount, DestinationSpec,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Scenario: 10 bulk units with factor 4 yield 40 packaged units
    #[test]
    fn test_factor_expansion() {
        let packaged = Uuid::new_v4();
        let spec = DestinationSpec::Factor {
            product_id: packaged,
            factor: dec("4"),
        };

        let outputs = expand_destinations(dec("10"), &spec).unwrap();
        assert_eq!(outputs, vec![(packaged, dec("40"))]);
    }

    /// Factor products are rounded to the ledger scale
    #[test]
    fn test_factor_rounds_to_ledger_scale() {
        let spec = DestinationSpec::Factor {
            product_id: Uuid::new_v4(),
            factor: dec("0.3333"),
        };

        let outputs = expand_destinations(dec("1"), &spec).unwrap();
        assert_eq!(outputs[0].1, dec("0.3333"));

        let outputs = expand_destinations(dec("0.5"), &spec).unwrap();
        // 0.5 * 0.3333 = 0.16665, rounded at 4 digits
        assert!(outputs[0].1.scale() <= 4);
        assert_eq!(outputs[0].1, dec("0.1666"));
    }

    /// Explicit amounts pass through and need not sum to the consumed
    /// quantity
    #[test]
    fn test_explicit_amounts_pass_through() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let spec = DestinationSpec::Amounts {
            amounts: vec![
                DestinationAmount {
                    product_id: a,
                    quantity: dec("3"),
                },
                DestinationAmount {
                    product_id: b,
                    quantity: dec("9"),
                },
            ],
        };

        let outputs = expand_destinations(dec("10"), &spec).unwrap();
        assert_eq!(outputs, vec![(a, dec("3")), (b, dec("9"))]);
    }

    #[test]
    fn test_empty_amounts_rejected() {
        let spec = DestinationSpec::Amounts { amounts: vec![] };
        assert!(expand_destinations(dec("10"), &spec).is_err());
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let spec = DestinationSpec::Amounts {
            amounts: vec![DestinationAmount {
                product_id: Uuid::new_v4(),
                quantity: Decimal::ZERO,
            }],
        };
        assert!(expand_destinations(dec("10"), &spec).is_err());
    }

    #[test]
    fn test_non_positive_factor_rejected() {
        for factor in ["0", "-2"] {
            let spec = DestinationSpec::Factor {
                product_id: Uuid::new_v4(),
                factor: dec(factor),
            };
            assert!(expand_destinations(dec("10"), &spec).is_err());
        }
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

    fn factor_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Factor expansion always yields one positive output for the
        /// declared product
        #[test]
        fn prop_factor_output_positive(
            consumed in quantity_strategy(),
            factor in factor_strategy()
        ) {
            let product = Uuid::new_v4();
            let spec = DestinationSpec::Factor { product_id: product, factor };

            let outputs = expand_destinations(consumed, &spec).unwrap();
            prop_assert_eq!(outputs.len(), 1);
            prop_assert_eq!(outputs[0].0, product);
            prop_assert!(outputs[0].1 > Decimal::ZERO);
        }

        /// Per-lot-chain conservation: the produced quantity is the
        /// declared function of the consumed quantity
        #[test]
        fn prop_factor_is_declared_function(
            consumed in quantity_strategy(),
            factor in factor_strategy()
        ) {
            let spec = DestinationSpec::Factor { product_id: Uuid::new_v4(), factor };

            let outputs = expand_destinations(consumed, &spec).unwrap();
            prop_assert_eq!(outputs[0].1, (consumed * factor).round_dp(4));
        }

        /// Amount expansion preserves the declared amounts exactly
        #[test]
        fn prop_amounts_preserved(
            quantities in prop::collection::vec(quantity_strategy(), 1..6),
            consumed in quantity_strategy()
        ) {
            let amounts: Vec<DestinationAmount> = quantities
                .iter()
                .map(|q| DestinationAmount { product_id: Uuid::new_v4(), quantity: *q })
                .collect();
            let spec = DestinationSpec::Amounts { amounts: amounts.clone() };

            let outputs = expand_destinations(consumed, &spec).unwrap();
            prop_assert_eq!(outputs.len(), amounts.len());
            for (output, amount) in outputs.iter().zip(&amounts) {
                prop_assert_eq!(output.0, amount.product_id);
                prop_assert_eq!(output.1, amount.quantity);
            }
        }
    }
}
