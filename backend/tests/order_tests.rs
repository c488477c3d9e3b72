//! Order charge computation tests
//!
//! Tests for the order snapshot including:
//! - Total accuracy (total == subtotal + delivery fee + tax)
//! - Channel-dependent delivery fees and commission rates
//! - Order number generation

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{generate_order_number, FeePolicy, OrderCharges, OrderLine};
use shared::types::OrderType;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Consumer orders pay the flat delivery fee plus tax
    #[test]
    fn test_b2c_charges() {
        let charges = OrderCharges::compute(dec("1000"), OrderType::B2c, &FeePolicy::default());

        assert_eq!(charges.subtotal, dec("1000"));
        assert_eq!(charges.delivery_fee, dec("50"));
        assert_eq!(charges.tax, dec("70.00"));
        assert_eq!(charges.total, dec("1120.00"));
    }

    /// Business orders ship free
    #[test]
    fn test_b2b_delivery_is_free() {
        let charges = OrderCharges::compute(dec("1000"), OrderType::B2b, &FeePolicy::default());

        assert_eq!(charges.delivery_fee, Decimal::ZERO);
        assert_eq!(charges.total, dec("1070.00"));
    }

    /// Tax rounds to two decimal places
    #[test]
    fn test_tax_rounding() {
        // 333.33 * 0.07 = 23.3331 -> 23.33
        let charges = OrderCharges::compute(dec("333.33"), OrderType::B2b, &FeePolicy::default());
        assert_eq!(charges.tax, dec("23.33"));

        // 333.50 * 0.07 = 23.345 -> banker's rounding to 23.34
        let charges = OrderCharges::compute(dec("333.50"), OrderType::B2b, &FeePolicy::default());
        assert_eq!(charges.tax, dec("23.34"));
    }

    /// Line totals round to two decimal places
    #[test]
    fn test_line_total_rounding() {
        let line = OrderLine::new(
            Uuid::new_v4(),
            "Jasmine Rice".to_string(),
            "kg".to_string(),
            dec("2.5"),
            dec("33.33"),
            Uuid::new_v4(),
        );

        // 2.5 * 33.33 = 83.325 -> 83.32
        assert_eq!(line.line_total, dec("83.32"));
    }

    /// Commission rates differ by channel
    #[test]
    fn test_commission_rate_by_channel() {
        let policy = FeePolicy::default();

        assert_eq!(policy.commission_rate(OrderType::B2c), dec("0.10"));
        assert_eq!(policy.commission_rate(OrderType::B2b), dec("0.05"));
    }

    /// Order numbers embed the channel, date, and zero-padded sequence
    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();

        assert_eq!(
            generate_order_number(OrderType::B2b, date, 42),
            "ORD-B2B-20260831-0042"
        );
        assert_eq!(
            generate_order_number(OrderType::B2c, date, 7),
            "ORD-B2C-20260831-0007"
        );
    }

    /// Sequences past four digits keep their full width
    #[test]
    fn test_order_number_long_sequence() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();

        assert_eq!(
            generate_order_number(OrderType::B2c, date, 123456),
            "ORD-B2C-20261201-123456"
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn subtotal_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10_000_000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 100000.00
    }

    fn order_type_strategy() -> impl Strategy<Value = OrderType> {
        prop_oneof![Just(OrderType::B2c), Just(OrderType::B2b)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The order total is always the exact sum of its parts
        #[test]
        fn prop_total_is_sum_of_parts(
            subtotal in subtotal_strategy(),
            order_type in order_type_strategy()
        ) {
            let policy = FeePolicy::default();
            let charges = OrderCharges::compute(subtotal, order_type, &policy);

            prop_assert_eq!(
                charges.total,
                charges.subtotal + charges.delivery_fee + charges.tax
            );
            prop_assert!(charges.tax >= Decimal::ZERO);
            prop_assert!(charges.tax.scale() <= 2);
        }

        /// Line totals never gain precision beyond two decimals
        #[test]
        fn prop_line_total_two_decimals(
            quantity in (1i64..=100000i64).prop_map(|n| Decimal::new(n, 2)),
            unit_price in (1i64..=1000000i64).prop_map(|n| Decimal::new(n, 2))
        ) {
            let line = OrderLine::new(
                Uuid::new_v4(),
                "Produce".to_string(),
                "kg".to_string(),
                quantity,
                unit_price,
                Uuid::new_v4(),
            );

            prop_assert!(line.line_total.scale() <= 2);
            prop_assert_eq!(line.line_total, (quantity * unit_price).round_dp(2));
        }
    }
}
