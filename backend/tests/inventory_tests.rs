//! Stock ledger tests
//!
//! Covers:
//! - Stock non-negativity under arbitrary IN/OUT sequences
//! - Rejected withdrawals leaving state untouched

use proptest::prelude::*;

// ============================================================================
// Simulation Helpers
// ============================================================================

/// Mirror of the ledger's conditional update: the sufficiency predicate and
/// the decrement are one step, a failed predicate changes nothing
fn apply_transaction(stock: i32, direction: &str, quantity: i32) -> Result<i32, &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }

    match direction {
        "IN" => Ok(stock + quantity),
        "OUT" => {
            if stock >= quantity {
                Ok(stock - quantity)
            } else {
                Err("Insufficient stock")
            }
        }
        _ => Err("Invalid direction"),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_inbound_increases_stock() {
        assert_eq!(apply_transaction(100, "IN", 50), Ok(150));
    }

    #[test]
    fn test_outbound_decreases_stock() {
        assert_eq!(apply_transaction(100, "OUT", 30), Ok(70));
    }

    #[test]
    fn test_exact_withdrawal_reaches_zero() {
        assert_eq!(apply_transaction(50, "OUT", 50), Ok(0));
    }

    #[test]
    fn test_overdraw_is_rejected() {
        assert!(apply_transaction(50, "OUT", 60).is_err());
    }

    #[test]
    fn test_zero_and_negative_quantities_rejected() {
        assert!(apply_transaction(100, "IN", 0).is_err());
        assert!(apply_transaction(100, "IN", -10).is_err());
        assert!(apply_transaction(100, "OUT", 0).is_err());
    }

    #[test]
    fn test_withdraw_from_empty_rejected() {
        assert!(apply_transaction(0, "OUT", 1).is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = i32> {
        1i32..=1000
    }

    fn direction_strategy() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("IN"), Just("OUT")]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Stock never goes negative under any transaction sequence; a
        /// rejected withdrawal leaves the balance unchanged
        #[test]
        fn prop_stock_never_negative(
            transactions in prop::collection::vec(
                (direction_strategy(), quantity_strategy()),
                1..50
            )
        ) {
            let mut stock = 0i32;

            for (direction, quantity) in &transactions {
                match apply_transaction(stock, direction, *quantity) {
                    Ok(new_stock) => stock = new_stock,
                    Err(_) => {
                        // No state change on rejection
                    }
                }
                prop_assert!(stock >= 0);
            }
        }

        /// Applying all inbound transactions accumulates exactly
        #[test]
        fn prop_inbound_accumulates(
            quantities in prop::collection::vec(quantity_strategy(), 1..30)
        ) {
            let mut stock = 0i32;
            for q in &quantities {
                stock = apply_transaction(stock, "IN", *q).unwrap();
            }
            let expected: i32 = quantities.iter().sum();
            prop_assert_eq!(stock, expected);
        }

        /// A withdrawal succeeds exactly when the balance is sufficient
        #[test]
        fn prop_withdrawal_iff_sufficient(
            stock in 0i32..=1000,
            quantity in quantity_strategy()
        ) {
            let result = apply_transaction(stock, "OUT", quantity);
            if stock >= quantity {
                prop_assert_eq!(result, Ok(stock - quantity));
            } else {
                prop_assert!(result.is_err());
            }
        }

        /// IN then equal OUT round-trips to the starting balance
        #[test]
        fn prop_in_out_round_trip(
            start in 0i32..=1000,
            quantity in quantity_strategy()
        ) {
            let after_in = apply_transaction(start, "IN", quantity).unwrap();
            let after_out = apply_transaction(after_in, "OUT", quantity).unwrap();
            prop_assert_eq!(after_out, start);
        }
    }
}
