//! Supplier payment protocol tests
//!
//! Covers:
//! - The 120 second QR validity window
//! - Payment terminality (Paid is absorbing)
//! - Total recomputation from authoritative weight and rate
//! - Single-winner semantics for concurrent confirmations

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    check_confirmation, compute_total, ConfirmationError, PaymentStatus,
};
use shared::validation::validate_collection_amount;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn reference_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Validity window the service mints tokens with
const QR_TOKEN_VALIDITY_SECS: i64 = 120;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Scenario: 10 kg at rate 250.5 totals 2505.00, recomputed identically
    /// at confirmation time from the stored values
    #[test]
    fn test_total_computation() {
        let at_collection = compute_total(dec("10"), dec("250.5"));
        assert_eq!(at_collection, dec("2505.00"));

        // Confirmation recomputes from the same authoritative fields
        let at_confirmation = compute_total(dec("10"), dec("250.5"));
        assert_eq!(at_confirmation, at_collection);
    }

    #[test]
    fn test_total_rounds_to_two_decimals() {
        assert_eq!(compute_total(dec("3.125"), dec("10.01")), dec("31.28"));
        assert_eq!(compute_total(dec("1.005"), dec("100")), dec("100.50"));
    }

    /// Confirmation succeeds just inside the window
    #[test]
    fn test_confirmation_within_window() {
        let supplier = Uuid::new_v4();
        let minted = reference_now();
        let exp = minted + Duration::seconds(QR_TOKEN_VALIDITY_SECS);

        let result = check_confirmation(
            supplier,
            Some(exp),
            PaymentStatus::QrGenerated,
            supplier,
            minted + Duration::seconds(119),
        );
        assert_eq!(result, Ok(()));
    }

    /// Confirmation at t=121s fails with the expiry error
    #[test]
    fn test_confirmation_after_window() {
        let supplier = Uuid::new_v4();
        let minted = reference_now();
        let exp = minted + Duration::seconds(QR_TOKEN_VALIDITY_SECS);

        let result = check_confirmation(
            supplier,
            Some(exp),
            PaymentStatus::QrGenerated,
            supplier,
            minted + Duration::seconds(121),
        );
        assert_eq!(result, Err(ConfirmationError::QrExpired));
    }

    /// A record without a minted QR can never confirm
    #[test]
    fn test_confirmation_requires_minted_qr() {
        let supplier = Uuid::new_v4();
        let result = check_confirmation(
            supplier,
            None,
            PaymentStatus::Pending,
            supplier,
            reference_now(),
        );
        assert_eq!(result, Err(ConfirmationError::QrExpired));
    }

    /// Ownership is checked before the QR window
    #[test]
    fn test_ownership_checked_first() {
        let supplier = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let result = check_confirmation(
            supplier,
            None,
            PaymentStatus::Pending,
            stranger,
            reference_now(),
        );
        assert_eq!(result, Err(ConfirmationError::NotOwner));
    }

    /// Paid is terminal whatever the window state
    #[test]
    fn test_paid_is_terminal() {
        let supplier = Uuid::new_v4();
        let exp = reference_now() + Duration::seconds(QR_TOKEN_VALIDITY_SECS);
        let result = check_confirmation(
            supplier,
            Some(exp),
            PaymentStatus::Paid,
            supplier,
            reference_now(),
        );
        assert_eq!(result, Err(ConfirmationError::AlreadyPaid));
    }

    /// Fat-finger heuristic on collection amounts
    #[test]
    fn test_repeated_digit_amounts_rejected() {
        assert!(validate_collection_amount(dec("111")).is_err());
        assert!(validate_collection_amount(dec("25.888")).is_err());
        assert!(validate_collection_amount(dec("250.5")).is_ok());
        assert!(validate_collection_amount(dec("12.75")).is_ok());
    }

    #[test]
    fn test_status_machine_strings() {
        assert_eq!(PaymentStatus::Pending.as_str(), "Pending");
        assert_eq!(PaymentStatus::QrGenerated.as_str(), "QR Generated");
        assert_eq!(PaymentStatus::Paid.as_str(), "Paid");
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(!PaymentStatus::QrGenerated.is_terminal());
    }
}

// ============================================================================
// Concurrent Confirmation Simulation
// ============================================================================

#[cfg(test)]
mod cas_simulation {
    use super::*;

    /// Mirror of the conditional UPDATE the service runs: the transition to
    /// Paid happens only when the predicate `status <> 'Paid'` still holds
    fn try_mark_paid(status: &mut PaymentStatus) -> Result<(), &'static str> {
        if status.is_terminal() {
            return Err("Already paid");
        }
        *status = PaymentStatus::Paid;
        Ok(())
    }

    #[test]
    fn test_exactly_one_confirmation_wins() {
        let mut status = PaymentStatus::QrGenerated;

        // Two confirmations serialized by the storage layer's row lock
        let first = try_mark_paid(&mut status);
        let second = try_mark_paid(&mut status);

        assert_eq!(first, Ok(()));
        assert_eq!(second, Err("Already paid"));
        assert_eq!(status, PaymentStatus::Paid);
    }

    #[test]
    fn test_replay_after_success_conflicts() {
        let mut status = PaymentStatus::QrGenerated;
        assert!(try_mark_paid(&mut status).is_ok());

        for _ in 0..3 {
            assert_eq!(try_mark_paid(&mut status), Err("Already paid"));
            assert_eq!(status, PaymentStatus::Paid);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1_000_000).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 10000.00
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The total always carries at most 2 decimal places
        #[test]
        fn prop_total_two_decimal_places(
            weight in amount_strategy(),
            rate in amount_strategy()
        ) {
            let total = compute_total(weight, rate);
            prop_assert!(total.normalize().scale() <= 2);
        }

        /// Recomputing the total from the same inputs is deterministic
        #[test]
        fn prop_total_recompute_stable(
            weight in amount_strategy(),
            rate in amount_strategy()
        ) {
            prop_assert_eq!(compute_total(weight, rate), compute_total(weight, rate));
        }

        /// Confirmation succeeds exactly when inside the window, owned, and
        /// not yet paid
        #[test]
        fn prop_confirmation_window_exact(
            elapsed_secs in 0i64..=300,
            paid in proptest::bool::ANY
        ) {
            let supplier = Uuid::new_v4();
            let minted = reference_now();
            let exp = minted + Duration::seconds(QR_TOKEN_VALIDITY_SECS);
            let status = if paid { PaymentStatus::Paid } else { PaymentStatus::QrGenerated };

            let result = check_confirmation(
                supplier,
                Some(exp),
                status,
                supplier,
                minted + Duration::seconds(elapsed_secs),
            );

            if elapsed_secs >= QR_TOKEN_VALIDITY_SECS {
                // Expiry wins over the paid check in the precondition order
                prop_assert_eq!(result, Err(ConfirmationError::QrExpired));
            } else if paid {
                prop_assert_eq!(result, Err(ConfirmationError::AlreadyPaid));
            } else {
                prop_assert_eq!(result, Ok(()));
            }
        }

        /// A foreign supplier is always rejected, whatever the record state
        #[test]
        fn prop_foreign_supplier_always_rejected(
            elapsed_secs in 0i64..=300,
            paid in proptest::bool::ANY
        ) {
            let supplier = Uuid::new_v4();
            let stranger = Uuid::new_v4();
            let minted = reference_now();
            let exp = minted + Duration::seconds(QR_TOKEN_VALIDITY_SECS);
            let status = if paid { PaymentStatus::Paid } else { PaymentStatus::QrGenerated };

            let result = check_confirmation(
                supplier,
                Some(exp),
                status,
                stranger,
                minted + Duration::seconds(elapsed_secs),
            );
            prop_assert_eq!(result, Err(ConfirmationError::NotOwner));
        }
    }
}
