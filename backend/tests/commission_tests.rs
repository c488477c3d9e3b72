//! Commission and payout ledger tests
//!
//! Tests for the settlement record including:
//! - Payout accuracy (payout == order amount - commission + adjustments)
//! - Settlement state machine
//! - Adjustment rules after payout

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    AdjustmentType, Commission, CommissionError, CommissionStatus, SellerType,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 31, 8, 0, 0).unwrap()
}

fn commission(order_amount: &str, rate: &str) -> Commission {
    Commission::for_order(
        Uuid::new_v4(),
        Uuid::new_v4(),
        SellerType::Farmer,
        dec(order_amount),
        dec(rate),
        t0(),
    )
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The platform keeps its cut, the seller gets the rest
    #[test]
    fn test_commission_derivation() {
        let commission = commission("1000", "0.10");

        assert_eq!(commission.commission_amount, dec("100.00"));
        assert_eq!(commission.seller_payout, dec("900.00"));
        assert_eq!(commission.status, CommissionStatus::Pending);
    }

    /// Commission amounts round to two decimal places
    #[test]
    fn test_commission_rounding() {
        // 333.33 * 0.05 = 16.6665 -> 16.67
        let commission = commission("333.33", "0.05");
        assert_eq!(commission.commission_amount, dec("16.67"));
        assert_eq!(commission.seller_payout, dec("316.66"));
    }

    /// A penalty reduces the payout
    #[test]
    fn test_penalty_adjustment() {
        let mut commission = commission("1000", "0.10");
        commission
            .add_adjustment(
                AdjustmentType::Penalty,
                dec("50"),
                "late delivery".to_string(),
                t0(),
            )
            .unwrap();

        assert_eq!(commission.seller_payout, dec("850.00"));
    }

    /// A bonus increases the payout; corrections carry their own sign
    #[test]
    fn test_bonus_and_correction_adjustments() {
        let mut commission = commission("1000", "0.10");
        commission
            .add_adjustment(
                AdjustmentType::Bonus,
                dec("25"),
                "quality bonus".to_string(),
                t0(),
            )
            .unwrap();
        assert_eq!(commission.seller_payout, dec("925.00"));

        commission
            .add_adjustment(
                AdjustmentType::Correction,
                dec("-10"),
                "weight discrepancy".to_string(),
                t0(),
            )
            .unwrap();
        assert_eq!(commission.seller_payout, dec("915.00"));
    }

    /// A refund flows back to the buyer, off the seller's payout
    #[test]
    fn test_refund_adjustment() {
        let mut commission = commission("500", "0.05");
        commission
            .add_adjustment(
                AdjustmentType::Refund,
                dec("100"),
                "partial return".to_string(),
                t0(),
            )
            .unwrap();

        // 500 - 25 - 100
        assert_eq!(commission.seller_payout, dec("375.00"));
    }

    /// The happy-path settlement chain stamps each transition
    #[test]
    fn test_settlement_chain() {
        let mut commission = commission("1000", "0.10");

        commission.transition(CommissionStatus::Collected, t0()).unwrap();
        commission.transition(CommissionStatus::Processing, t0()).unwrap();
        commission.transition(CommissionStatus::Paid, t0()).unwrap();

        assert_eq!(commission.status, CommissionStatus::Paid);
        assert!(commission.collected_at.is_some());
        assert!(commission.processing_at.is_some());
        assert!(commission.paid_at.is_some());
        assert!(commission.refunded_at.is_none());
    }

    /// Failed is reachable from processing, refunded from paid
    #[test]
    fn test_failure_and_refund_branches() {
        let mut failing = commission("1000", "0.10");
        failing.transition(CommissionStatus::Collected, t0()).unwrap();
        failing.transition(CommissionStatus::Processing, t0()).unwrap();
        failing.transition(CommissionStatus::Failed, t0()).unwrap();
        assert!(failing.failed_at.is_some());

        let mut refunding = commission("1000", "0.10");
        refunding.transition(CommissionStatus::Collected, t0()).unwrap();
        refunding.transition(CommissionStatus::Processing, t0()).unwrap();
        refunding.transition(CommissionStatus::Paid, t0()).unwrap();
        refunding.transition(CommissionStatus::Refunded, t0()).unwrap();
        assert!(refunding.refunded_at.is_some());
    }

    /// Skipping states or moving backwards is rejected
    #[test]
    fn test_invalid_transitions_rejected() {
        let mut commission = commission("1000", "0.10");

        let err = commission
            .transition(CommissionStatus::Paid, t0())
            .unwrap_err();
        assert_eq!(
            err,
            CommissionError::InvalidTransition {
                from: "pending".to_string(),
                to: "paid".to_string(),
            }
        );

        commission.transition(CommissionStatus::Collected, t0()).unwrap();
        assert!(commission
            .transition(CommissionStatus::Pending, t0())
            .is_err());
        assert!(commission
            .transition(CommissionStatus::Refunded, t0())
            .is_err());
    }

    /// Once paid, the payout is final
    #[test]
    fn test_adjustment_after_payout_rejected() {
        let mut commission = commission("1000", "0.10");
        commission.transition(CommissionStatus::Collected, t0()).unwrap();
        commission.transition(CommissionStatus::Processing, t0()).unwrap();

        // Still adjustable while processing
        commission
            .add_adjustment(AdjustmentType::Penalty, dec("10"), "damage".to_string(), t0())
            .unwrap();

        commission.transition(CommissionStatus::Paid, t0()).unwrap();
        let err = commission
            .add_adjustment(AdjustmentType::Bonus, dec("10"), "too late".to_string(), t0())
            .unwrap_err();

        assert_eq!(
            err,
            CommissionError::AdjustmentAfterPayout {
                status: "paid".to_string(),
            }
        );
        assert_eq!(commission.seller_payout, dec("890.00"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (100i64..=10_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn adjustment_strategy() -> impl Strategy<Value = (AdjustmentType, Decimal)> {
        let kind = prop_oneof![
            Just(AdjustmentType::Refund),
            Just(AdjustmentType::Penalty),
            Just(AdjustmentType::Bonus),
            Just(AdjustmentType::Correction),
        ];
        (kind, (1i64..=10000i64).prop_map(|n| Decimal::new(n, 2)))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The stored payout always equals the recomputed one, no matter how
        /// many adjustments pile up
        #[test]
        fn prop_payout_matches_recomputation(
            order_amount in amount_strategy(),
            adjustments in prop::collection::vec(adjustment_strategy(), 0..10)
        ) {
            let mut commission = Commission::for_order(
                Uuid::new_v4(),
                Uuid::new_v4(),
                SellerType::Business,
                order_amount,
                dec("0.05"),
                t0(),
            );

            for (kind, amount) in adjustments {
                commission
                    .add_adjustment(kind, amount, "test".to_string(), t0())
                    .unwrap();
            }

            prop_assert_eq!(commission.seller_payout, commission.recomputed_payout());
        }

        /// Commission plus payout returns the order amount before adjustments
        #[test]
        fn prop_commission_plus_payout_is_order_amount(order_amount in amount_strategy()) {
            let commission = Commission::for_order(
                Uuid::new_v4(),
                Uuid::new_v4(),
                SellerType::Farmer,
                order_amount,
                dec("0.10"),
                t0(),
            );

            prop_assert_eq!(
                commission.commission_amount + commission.seller_payout,
                order_amount
            );
        }
    }
}
