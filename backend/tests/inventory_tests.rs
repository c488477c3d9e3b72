//! Inventory lot and reservation tests
//!
//! Tests for the reservation lifecycle including:
//! - Reserved quantity accuracy (reserved == sum of holding reservations)
//! - Time-limited reservations and expiry sweeping
//! - Idempotent cancellation

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{InventoryLot, LotError, QualityGrade, ReservationStatus};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 31, 8, 0, 0).unwrap()
}

fn lot(total: &str) -> InventoryLot {
    InventoryLot::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        dec(total),
        NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
        Some(NaiveDate::from_ymd_opt(2026, 9, 20).unwrap()),
        QualityGrade::GradeA,
        t0(),
    )
}

fn ttl() -> Duration {
    Duration::minutes(30)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Reserving reduces availability and grows the reserved quantity
    #[test]
    fn test_reserve_reduces_available() {
        let mut lot = lot("100");
        let order_id = Uuid::new_v4();

        lot.reserve(Some(order_id), dec("30"), t0(), ttl()).unwrap();

        assert_eq!(lot.reserved_quantity, dec("30"));
        assert_eq!(lot.available(), dec("70"));
        assert_eq!(lot.holding_sum(), lot.reserved_quantity);
    }

    /// A request beyond availability fails and changes nothing
    #[test]
    fn test_insufficient_stock_rejected() {
        let mut lot = lot("100");
        lot.reserve(Some(Uuid::new_v4()), dec("80"), t0(), ttl())
            .unwrap();

        let err = lot
            .reserve(Some(Uuid::new_v4()), dec("30"), t0(), ttl())
            .unwrap_err();

        assert_eq!(
            err,
            LotError::InsufficientStock {
                requested: dec("30"),
                available: dec("20"),
            }
        );
        assert_eq!(lot.reserved_quantity, dec("80"));
    }

    /// Zero and negative quantities are rejected up front
    #[test]
    fn test_non_positive_quantity_rejected() {
        let mut lot = lot("100");

        let err = lot
            .reserve(Some(Uuid::new_v4()), dec("0"), t0(), ttl())
            .unwrap_err();
        assert_eq!(err, LotError::NonPositiveQuantity);

        let err = lot
            .reserve(Some(Uuid::new_v4()), dec("-5"), t0(), ttl())
            .unwrap_err();
        assert_eq!(err, LotError::NonPositiveQuantity);
    }

    /// One holding reservation per order per lot
    #[test]
    fn test_duplicate_order_reservation_rejected() {
        let mut lot = lot("100");
        let order_id = Uuid::new_v4();

        lot.reserve(Some(order_id), dec("10"), t0(), ttl()).unwrap();
        let err = lot
            .reserve(Some(order_id), dec("10"), t0(), ttl())
            .unwrap_err();

        assert_eq!(err, LotError::DuplicateReservation);
    }

    /// An overdue active reservation releases its quantity on sweep
    #[test]
    fn test_expired_reservation_released() {
        let mut lot = lot("100");
        let order_id = Uuid::new_v4();
        lot.reserve(Some(order_id), dec("40"), t0(), ttl()).unwrap();

        let later = t0() + Duration::minutes(31);
        assert!(lot.has_expired_reservation(later));

        let expired = lot.sweep_expired(later);
        assert_eq!(expired.len(), 1);
        assert_eq!(lot.reserved_quantity, Decimal::ZERO);
        assert_eq!(lot.available(), dec("100"));
        assert_eq!(lot.reservations[0].status, ReservationStatus::Expired);
    }

    /// A reservation exactly at its deadline is already expired
    #[test]
    fn test_expiry_boundary_inclusive() {
        let mut lot = lot("100");
        lot.reserve(Some(Uuid::new_v4()), dec("10"), t0(), ttl())
            .unwrap();

        let deadline = t0() + ttl();
        assert!(lot.has_expired_reservation(deadline));
    }

    /// Confirmed reservations keep holding stock forever
    #[test]
    fn test_confirmed_reservation_never_expires() {
        let mut lot = lot("100");
        let order_id = Uuid::new_v4();
        lot.reserve(Some(order_id), dec("25"), t0(), ttl()).unwrap();
        lot.confirm_reservation(order_id, t0()).unwrap();

        let much_later = t0() + Duration::days(7);
        let expired = lot.sweep_expired(much_later);

        assert!(expired.is_empty());
        assert_eq!(lot.reserved_quantity, dec("25"));
        assert_eq!(lot.reservations[0].status, ReservationStatus::Confirmed);
    }

    /// Confirming a missing or already released reservation fails
    #[test]
    fn test_confirm_without_reservation_fails() {
        let mut lot = lot("100");
        let order_id = Uuid::new_v4();

        let err = lot.confirm_reservation(order_id, t0()).unwrap_err();
        assert_eq!(err, LotError::ReservationNotFound);

        lot.reserve(Some(order_id), dec("10"), t0(), ttl()).unwrap();
        lot.cancel_reservation(order_id, t0());
        let err = lot.confirm_reservation(order_id, t0()).unwrap_err();
        assert_eq!(err, LotError::ReservationNotFound);
    }

    /// A reservation that expired before confirmation cannot be confirmed
    #[test]
    fn test_confirm_after_expiry_fails() {
        let mut lot = lot("100");
        let order_id = Uuid::new_v4();
        lot.reserve(Some(order_id), dec("10"), t0(), ttl()).unwrap();

        let later = t0() + Duration::hours(1);
        let err = lot.confirm_reservation(order_id, later).unwrap_err();
        assert_eq!(err, LotError::ReservationNotFound);
        assert_eq!(lot.available(), dec("100"));
    }

    /// Cancelling releases stock; a second cancel is a no-op
    #[test]
    fn test_cancel_is_idempotent() {
        let mut lot = lot("100");
        let order_id = Uuid::new_v4();
        lot.reserve(Some(order_id), dec("20"), t0(), ttl()).unwrap();

        assert!(lot.cancel_reservation(order_id, t0()));
        assert_eq!(lot.reserved_quantity, Decimal::ZERO);

        assert!(!lot.cancel_reservation(order_id, t0()));
        assert_eq!(lot.reserved_quantity, Decimal::ZERO);
    }

    /// Rolling back by reservation id works before any order is attached
    #[test]
    fn test_cancel_by_id_before_attach() {
        let mut lot = lot("100");
        let reservation_id = lot.reserve(None, dec("15"), t0(), ttl()).unwrap();

        assert!(lot.cancel_reservation_by_id(reservation_id, t0()));
        assert_eq!(lot.available(), dec("100"));
        assert!(!lot.cancel_reservation_by_id(reservation_id, t0()));
    }

    /// Attaching an order lets the order-keyed operations find the claim
    #[test]
    fn test_attach_order_then_confirm() {
        let mut lot = lot("100");
        let order_id = Uuid::new_v4();
        let reservation_id = lot.reserve(None, dec("12"), t0(), ttl()).unwrap();

        lot.attach_order(reservation_id, order_id).unwrap();
        let confirmed = lot.confirm_reservation(order_id, t0()).unwrap();

        assert_eq!(confirmed, reservation_id);
        assert_eq!(lot.reserved_quantity, dec("12"));
    }

    /// A failed line in a multi-item batch rolls back the reservations
    /// already placed for earlier lines, restoring each lot's pre-batch
    /// reserved quantity
    #[test]
    fn test_batch_rollback_restores_earlier_lots() {
        let mut lot_a = lot("100");
        let mut lot_b = lot("50");
        let mut lot_c = lot("5");
        let reserved_a_before = lot_a.reserved_quantity;
        let reserved_b_before = lot_b.reserved_quantity;

        // First two lines reserve fine; the third line has no stock, so no
        // order may be persisted and the earlier claims must be rolled back.
        let first = lot_a.reserve(None, dec("30"), t0(), ttl()).unwrap();
        let second = lot_b.reserve(None, dec("20"), t0(), ttl()).unwrap();
        let err = lot_c.reserve(None, dec("30"), t0(), ttl()).unwrap_err();
        assert!(matches!(err, LotError::InsufficientStock { .. }));

        assert!(lot_a.cancel_reservation_by_id(first, t0()));
        assert!(lot_b.cancel_reservation_by_id(second, t0()));

        assert_eq!(lot_a.reserved_quantity, reserved_a_before);
        assert_eq!(lot_b.reserved_quantity, reserved_b_before);
        assert_eq!(lot_a.available(), dec("100"));
        assert_eq!(lot_b.available(), dec("50"));
        assert_eq!(lot_a.holding_sum(), Decimal::ZERO);
        assert_eq!(lot_b.holding_sum(), Decimal::ZERO);
    }

    /// Stock freed by expiry can be reserved again in the same call
    #[test]
    fn test_reserve_sweeps_before_checking_stock() {
        let mut lot = lot("100");
        lot.reserve(Some(Uuid::new_v4()), dec("90"), t0(), ttl())
            .unwrap();

        let later = t0() + Duration::hours(1);
        lot.reserve(Some(Uuid::new_v4()), dec("90"), later, ttl())
            .unwrap();

        assert_eq!(lot.reserved_quantity, dec("90"));
        assert_eq!(lot.holding_sum(), dec("90"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating reservation quantities
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=500i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 50.0
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reserve(Decimal),
        CancelLast,
        ConfirmLast,
        SweepLater,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            quantity_strategy().prop_map(Op::Reserve),
            Just(Op::CancelLast),
            Just(Op::ConfirmLast),
            Just(Op::SweepLater),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Reserved quantity always equals the sum of holding reservations
        /// and never leaves [0, total]
        #[test]
        fn prop_reserved_matches_holding_sum(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let mut lot = lot("200");
            let mut now = t0();
            let mut orders: Vec<Uuid> = Vec::new();

            for op in ops {
                match op {
                    Op::Reserve(quantity) => {
                        let order_id = Uuid::new_v4();
                        if lot.reserve(Some(order_id), quantity, now, ttl()).is_ok() {
                            orders.push(order_id);
                        }
                    }
                    Op::CancelLast => {
                        if let Some(order_id) = orders.pop() {
                            lot.cancel_reservation(order_id, now);
                        }
                    }
                    Op::ConfirmLast => {
                        if let Some(order_id) = orders.last() {
                            let _ = lot.confirm_reservation(*order_id, now);
                        }
                    }
                    Op::SweepLater => {
                        now += Duration::minutes(31);
                        lot.sweep_expired(now);
                    }
                }

                prop_assert_eq!(lot.reserved_quantity, lot.holding_sum());
                prop_assert!(lot.reserved_quantity >= Decimal::ZERO);
                prop_assert!(lot.reserved_quantity <= lot.total_quantity);
            }
        }

        /// Reserving then cancelling restores full availability
        #[test]
        fn prop_reserve_cancel_roundtrip(quantity in quantity_strategy()) {
            let mut lot = lot("200");
            let order_id = Uuid::new_v4();

            lot.reserve(Some(order_id), quantity, t0(), ttl()).unwrap();
            prop_assert!(lot.cancel_reservation(order_id, t0()));
            prop_assert_eq!(lot.available(), dec("200"));
        }
    }
}
