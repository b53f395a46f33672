//! Outbox retry schedule tests
//!
//! The dispatcher never retries a sent event; a failing event waits
//! longer after each attempt, up to the configured cap.

use proptest::prelude::*;

use stock_ledger_backend::services::outbox::retry_delay_secs;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_first_failure_waits_base() {
        assert_eq!(retry_delay_secs(1, 30, 3600), 30);
    }

    #[test]
    fn test_delay_doubles_per_failure() {
        assert_eq!(retry_delay_secs(2, 30, 3600), 60);
        assert_eq!(retry_delay_secs(3, 30, 3600), 120);
        assert_eq!(retry_delay_secs(4, 30, 3600), 240);
    }

    /// Three failed deliveries produce strictly increasing delays
    #[test]
    fn test_three_failures_strictly_increase() {
        let delays: Vec<u64> = (1..=3).map(|n| retry_delay_secs(n, 30, 3600)).collect();
        assert!(delays[0] < delays[1] && delays[1] < delays[2]);
        assert!(delays.iter().all(|d| *d <= 3600));
    }

    #[test]
    fn test_delay_capped_at_maximum() {
        assert_eq!(retry_delay_secs(8, 30, 3600), 3600);
        assert_eq!(retry_delay_secs(64, 30, 3600), 3600);
        assert_eq!(retry_delay_secs(i32::MAX, 30, 3600), 3600);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Delays never decrease and never exceed the cap
        #[test]
        fn prop_schedule_monotone_and_bounded(
            base in 1u64..=600,
            max_factor in 1u64..=200,
            attempts in 1i32..=40
        ) {
            let max = base * max_factor;
            let mut previous = 0u64;
            for attempt in 1..=attempts {
                let delay = retry_delay_secs(attempt, base, max);
                prop_assert!(delay >= previous);
                prop_assert!(delay <= max);
                previous = delay;
            }
        }

        /// Until the cap is reached, each failure doubles the wait
        #[test]
        fn prop_doubles_until_cap(base in 1u64..=600, attempts in 2i32..=20) {
            let max = base * 1_000_000;
            let previous = retry_delay_secs(attempts - 1, base, max);
            let current = retry_delay_secs(attempts, base, max);
            if current < max {
                prop_assert_eq!(current, previous * 2);
            }
        }

        /// The first delay is always the base delay
        #[test]
        fn prop_first_delay_is_base(base in 1u64..=600) {
            prop_assert_eq!(retry_delay_secs(1, base, base * 100), base);
        }
    }
}
