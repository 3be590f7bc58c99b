//! Stock status engine tests
//!
//! Covers:
//! - Classification totality and exclusivity
//! - Expiry dominance over stock conditions
//! - Alert re-evaluation idempotence

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use shared::models::{
    classify, days_to_expiry, expired_message, is_low_stock, is_near_expiry, low_stock_message,
    near_expiry_message, AlertType, StockStatus, NEAR_EXPIRY_WINDOW_DAYS,
};

fn reference_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Scenario: low stock with a distant expiry
    #[test]
    fn test_low_stock_classification() {
        let now = reference_now();
        let status = classify(5, 10, now + Duration::days(20), now);
        assert_eq!(status, StockStatus::LowStock);
    }

    /// Scenario: healthy stock close to expiry
    #[test]
    fn test_near_expiry_classification() {
        let now = reference_now();
        let status = classify(100, 10, now + Duration::days(5), now);
        assert_eq!(status, StockStatus::NearExpiry);
    }

    /// Scenario: expiry overrides low stock
    #[test]
    fn test_expired_overrides_low_stock() {
        let now = reference_now();
        let status = classify(5, 10, now - Duration::days(1), now);
        assert_eq!(status, StockStatus::Expired);
    }

    /// Both conditions at once
    #[test]
    fn test_combined_classification() {
        let now = reference_now();
        let status = classify(2, 10, now + Duration::days(10), now);
        assert_eq!(status, StockStatus::LowStockNearExpiry);
    }

    /// Zero stock with zero minimum is not low stock
    #[test]
    fn test_zero_minimum_never_low() {
        let now = reference_now();
        let status = classify(0, 0, now + Duration::days(60), now);
        assert_eq!(status, StockStatus::Ok);
    }

    /// The near-expiry window boundary is inclusive at 14 days
    #[test]
    fn test_window_boundary() {
        let now = reference_now();
        let at_window = now + Duration::days(NEAR_EXPIRY_WINDOW_DAYS);
        assert_eq!(classify(50, 10, at_window, now), StockStatus::NearExpiry);

        let past_window = at_window + Duration::seconds(1);
        assert_eq!(classify(50, 10, past_window, now), StockStatus::Ok);
    }

    /// A partial day to expiry counts as a full day
    #[test]
    fn test_days_to_expiry_ceiling() {
        let now = reference_now();
        assert_eq!(days_to_expiry(now + Duration::minutes(30), now), 1);
        assert_eq!(days_to_expiry(now + Duration::days(14), now), 14);
        assert_eq!(
            days_to_expiry(now + Duration::days(14) + Duration::milliseconds(1), now),
            15
        );
    }

    /// Alert message formats
    #[test]
    fn test_alert_messages() {
        assert_eq!(
            low_stock_message("Earl Grey 250g", 3, 20),
            "Earl Grey 250g is below minimum stock (3 < 20)"
        );
        assert_eq!(
            near_expiry_message("Earl Grey 250g", 7),
            "Earl Grey 250g is nearing expiry (7 days remaining)"
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn stock_strategy() -> impl Strategy<Value = i32> {
        0i32..=100_000
    }

    /// Offset from "now" to the expiry instant, in seconds (both sides)
    fn expiry_offset_strategy() -> impl Strategy<Value = i64> {
        -10_000_000i64..=10_000_000
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Classification is total: every input maps to exactly one of the
        /// five statuses
        #[test]
        fn prop_classification_total(
            stock in stock_strategy(),
            min_stock in stock_strategy(),
            offset_secs in expiry_offset_strategy()
        ) {
            let now = reference_now();
            let expiry = now + Duration::seconds(offset_secs);
            let status = classify(stock, min_stock, expiry, now);

            let all = [
                StockStatus::Ok,
                StockStatus::LowStock,
                StockStatus::NearExpiry,
                StockStatus::LowStockNearExpiry,
                StockStatus::Expired,
            ];
            prop_assert_eq!(all.iter().filter(|s| **s == status).count(), 1);
        }

        /// Expiry always wins, whatever the stock levels
        #[test]
        fn prop_expiry_dominates(
            stock in stock_strategy(),
            min_stock in stock_strategy(),
            past_secs in 0i64..=10_000_000
        ) {
            let now = reference_now();
            let expiry = now - Duration::seconds(past_secs);
            prop_assert_eq!(classify(stock, min_stock, expiry, now), StockStatus::Expired);
        }

        /// A product that is not expired is expired-free
        #[test]
        fn prop_future_expiry_never_expired(
            stock in stock_strategy(),
            min_stock in stock_strategy(),
            future_secs in 1i64..=10_000_000
        ) {
            let now = reference_now();
            let expiry = now + Duration::seconds(future_secs);
            prop_assert_ne!(classify(stock, min_stock, expiry, now), StockStatus::Expired);
        }

        /// Low-stock statuses appear exactly when stock < min_stock (and the
        /// product is not expired)
        #[test]
        fn prop_low_stock_iff_below_minimum(
            stock in stock_strategy(),
            min_stock in stock_strategy(),
            future_secs in 1i64..=10_000_000
        ) {
            let now = reference_now();
            let expiry = now + Duration::seconds(future_secs);
            let status = classify(stock, min_stock, expiry, now);

            let is_low = matches!(
                status,
                StockStatus::LowStock | StockStatus::LowStockNearExpiry
            );
            prop_assert_eq!(is_low, stock < min_stock);
        }
    }
}

// ============================================================================
// Alert Re-evaluation Simulation
// ============================================================================

#[cfg(test)]
mod alert_simulation {
    use super::*;
    use std::collections::HashMap;

    /// In-memory model of the alert side-table keyed like the unique index
    type AlertTable = HashMap<AlertType, String>;

    /// The replace-then-upsert algorithm the alert service runs per product:
    /// low stock is tracked independently of freshness, expired upserts,
    /// near-expiry only applies to products that have not expired
    fn evaluate(
        table: &mut AlertTable,
        name: &str,
        stock: i32,
        min_stock: i32,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        table.remove(&AlertType::LowStock);
        table.remove(&AlertType::NearExpiry);

        let expired = classify(stock, min_stock, expiry, now) == StockStatus::Expired;

        if is_low_stock(stock, min_stock) {
            table.insert(AlertType::LowStock, low_stock_message(name, stock, min_stock));
        }

        if expired {
            table.insert(AlertType::Expired, expired_message(name, expiry));
        } else if is_near_expiry(expiry, now) {
            let days = days_to_expiry(expiry, now);
            table.insert(AlertType::NearExpiry, near_expiry_message(name, days));
        }
    }

    #[test]
    fn test_reevaluation_is_idempotent() {
        let now = reference_now();
        let expiry = now + Duration::days(5);
        let mut table = AlertTable::new();

        evaluate(&mut table, "Silver Tips", 2, 10, expiry, now);
        let first = table.clone();
        evaluate(&mut table, "Silver Tips", 2, 10, expiry, now);

        assert_eq!(table, first);
        assert_eq!(table.len(), 2); // low stock + near expiry, one each
    }

    #[test]
    fn test_expired_alert_never_duplicates() {
        let now = reference_now();
        let expiry = now - Duration::days(1);
        let mut table = AlertTable::new();

        for _ in 0..5 {
            evaluate(&mut table, "Silver Tips", 50, 10, expiry, now);
        }

        assert_eq!(table.len(), 1);
        assert!(table.contains_key(&AlertType::Expired));
    }

    #[test]
    fn test_expired_low_stock_product_carries_both_alerts() {
        let now = reference_now();
        let mut table = AlertTable::new();

        evaluate(&mut table, "Silver Tips", 2, 10, now - Duration::days(1), now);

        assert_eq!(table.len(), 2);
        assert!(table.contains_key(&AlertType::Expired));
        assert!(table.contains_key(&AlertType::LowStock));
        assert!(!table.contains_key(&AlertType::NearExpiry));
    }

    #[test]
    fn test_recovery_clears_active_alerts() {
        let now = reference_now();
        let mut table = AlertTable::new();

        evaluate(&mut table, "Silver Tips", 2, 10, now + Duration::days(5), now);
        assert_eq!(table.len(), 2);

        // Restocked and expiry pushed out: nothing active remains
        evaluate(&mut table, "Silver Tips", 50, 10, now + Duration::days(90), now);
        assert!(table.is_empty());
    }

    #[test]
    fn test_expired_alert_survives_reevaluation_of_active_types() {
        let now = reference_now();
        let mut table = AlertTable::new();

        evaluate(&mut table, "Silver Tips", 2, 10, now - Duration::days(1), now);
        assert!(table.contains_key(&AlertType::Expired));

        // Expired is terminal; later evaluations keep the single record
        evaluate(&mut table, "Silver Tips", 50, 10, now - Duration::days(2), now);
        assert_eq!(table.len(), 1);
    }

    proptest! {
        /// Re-running an evaluation with unchanged inputs never changes the
        /// table (idempotence over arbitrary inputs)
        #[test]
        fn prop_evaluation_idempotent(
            stock in 0i32..=1000,
            min_stock in 0i32..=1000,
            offset_secs in -5_000_000i64..=5_000_000
        ) {
            let now = reference_now();
            let expiry = now + Duration::seconds(offset_secs);
            let mut table = AlertTable::new();

            evaluate(&mut table, "Sample", stock, min_stock, expiry, now);
            let first = table.clone();
            evaluate(&mut table, "Sample", stock, min_stock, expiry, now);

            prop_assert_eq!(table, first);
        }

        /// At most one alert of each type exists after any evaluation
        /// sequence (the map key enforces what the unique index enforces)
        #[test]
        fn prop_at_most_one_alert_per_type(
            evaluations in prop::collection::vec(
                (0i32..=100, 0i32..=100, -2_000_000i64..=2_000_000),
                1..10
            )
        ) {
            let now = reference_now();
            let mut table = AlertTable::new();

            for (stock, min_stock, offset) in evaluations {
                evaluate(&mut table, "Sample", stock, min_stock, now + Duration::seconds(offset), now);
            }

            prop_assert!(table.len() <= 3);
        }
    }
}
