//! Price agreement and tier resolution tests
//!
//! Tests for negotiated B2B pricing including:
//! - Tier matching with inclusive bounds
//! - Applicability window checks
//! - Tier list validation at creation time

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{AgreementStatus, PriceAgreement, PriceTier, PricingError};
use shared::validation::validate_tiers;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 31, 8, 0, 0).unwrap()
}

fn tier(min: &str, max: Option<&str>, price: &str) -> PriceTier {
    PriceTier {
        min_quantity: dec(min),
        max_quantity: max.map(dec),
        unit_price: dec(price),
    }
}

fn agreement(tiers: Vec<PriceTier>, status: AgreementStatus) -> PriceAgreement {
    PriceAgreement {
        id: Uuid::new_v4(),
        seller_id: Uuid::new_v4(),
        buyer_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        tiers,
        valid_from: t0() - Duration::days(1),
        valid_until: t0() + Duration::days(30),
        status,
        approved_at: Some(t0() - Duration::days(1)),
        created_at: t0() - Duration::days(2),
        updated_at: t0() - Duration::days(1),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Higher quantity tiers yield the negotiated lower price
    #[test]
    fn test_tier_resolution_by_quantity() {
        let agreement = agreement(
            vec![
                tier("1", Some("9"), "100"),
                tier("10", Some("49"), "90"),
                tier("50", None, "80"),
            ],
            AgreementStatus::Active,
        );

        assert_eq!(agreement.resolve_price(dec("5")).unwrap(), dec("100"));
        assert_eq!(agreement.resolve_price(dec("10")).unwrap(), dec("90"));
        assert_eq!(agreement.resolve_price(dec("500")).unwrap(), dec("80"));
    }

    /// Both tier bounds are inclusive
    #[test]
    fn test_tier_bounds_inclusive() {
        let agreement = agreement(
            vec![tier("1", Some("9"), "100"), tier("10", None, "90")],
            AgreementStatus::Active,
        );

        assert_eq!(agreement.resolve_price(dec("1")).unwrap(), dec("100"));
        assert_eq!(agreement.resolve_price(dec("9")).unwrap(), dec("100"));
        assert_eq!(agreement.resolve_price(dec("9.5")).unwrap_err(),
            PricingError::NoPricingTierForQuantity { quantity: dec("9.5") });
        assert_eq!(agreement.resolve_price(dec("10")).unwrap(), dec("90"));
    }

    /// A quantity falling in a gap between tiers has no price
    #[test]
    fn test_quantity_in_gap_has_no_tier() {
        let agreement = agreement(
            vec![tier("1", Some("9"), "100"), tier("20", None, "85")],
            AgreementStatus::Active,
        );

        let err = agreement.resolve_price(dec("15")).unwrap_err();
        assert_eq!(
            err,
            PricingError::NoPricingTierForQuantity { quantity: dec("15") }
        );
    }

    /// A quantity below the lowest minimum has no price
    #[test]
    fn test_quantity_below_lowest_tier() {
        let agreement = agreement(
            vec![tier("10", None, "90")],
            AgreementStatus::Active,
        );

        let err = agreement.resolve_price(dec("5")).unwrap_err();
        assert_eq!(
            err,
            PricingError::NoPricingTierForQuantity { quantity: dec("5") }
        );
    }

    /// Only an approved agreement inside its window applies
    #[test]
    fn test_applicability_requires_active_status() {
        for status in [
            AgreementStatus::Draft,
            AgreementStatus::PendingApproval,
            AgreementStatus::Expired,
            AgreementStatus::Cancelled,
            AgreementStatus::Rejected,
        ] {
            let agreement = agreement(vec![tier("1", None, "100")], status);
            assert!(!agreement.is_applicable(t0()));
        }

        let active = agreement(vec![tier("1", None, "100")], AgreementStatus::Active);
        assert!(active.is_applicable(t0()));
    }

    /// The validity window is checked at read time
    #[test]
    fn test_applicability_window() {
        let mut agreement = agreement(vec![tier("1", None, "100")], AgreementStatus::Active);

        assert!(agreement.is_applicable(agreement.valid_from));
        assert!(agreement.is_applicable(agreement.valid_until));
        assert!(!agreement.is_applicable(agreement.valid_from - Duration::seconds(1)));
        assert!(!agreement.is_applicable(agreement.valid_until + Duration::seconds(1)));

        // A stale Active record past its window no longer applies
        agreement.valid_until = t0() - Duration::days(1);
        assert!(!agreement.is_applicable(t0()));
    }

    /// A well-formed tier list passes validation
    #[test]
    fn test_validate_tiers_accepts_sorted_list() {
        let tiers = vec![
            tier("1", Some("9"), "100"),
            tier("10", Some("49"), "90"),
            tier("50", None, "80"),
        ];
        assert!(validate_tiers(&tiers).is_ok());
    }

    /// Gaps between tiers are permitted at creation
    #[test]
    fn test_validate_tiers_allows_gaps() {
        let tiers = vec![tier("1", Some("9"), "100"), tier("20", None, "85")];
        assert!(validate_tiers(&tiers).is_ok());
    }

    /// Empty lists, overlaps, unsorted lists, and early open-ended tiers
    /// are all rejected
    #[test]
    fn test_validate_tiers_rejections() {
        assert!(validate_tiers(&[]).is_err());

        let overlapping = vec![tier("1", Some("10"), "100"), tier("10", None, "90")];
        assert!(validate_tiers(&overlapping).is_err());

        let unsorted = vec![tier("10", None, "90"), tier("1", Some("9"), "100")];
        assert!(validate_tiers(&unsorted).is_err());

        let early_open = vec![tier("1", None, "100"), tier("10", None, "90")];
        assert!(validate_tiers(&early_open).is_err());

        let inverted = vec![tier("10", Some("5"), "100")];
        assert!(validate_tiers(&inverted).is_err());

        let free = vec![tier("1", None, "0")];
        assert!(validate_tiers(&free).is_err());

        let negative_min = vec![tier("-1", None, "100")];
        assert!(validate_tiers(&negative_min).is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100000i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// With contiguous tiers covering all positive quantities, every
        /// quantity resolves and the resolved tier actually covers it
        #[test]
        fn prop_contiguous_tiers_always_resolve(quantity in quantity_strategy()) {
            let agreement = agreement(
                vec![
                    tier("0", Some("9.9"), "100"),
                    tier("10", Some("99.9"), "90"),
                    tier("100", None, "80"),
                ],
                AgreementStatus::Active,
            );

            let resolved = agreement.resolve_tier(quantity).unwrap();
            prop_assert!(resolved.covers(quantity));
        }

        /// Resolution scans in ascending order, so at most one tier of a
        /// validated list covers any quantity
        #[test]
        fn prop_validated_tiers_cover_at_most_once(quantity in quantity_strategy()) {
            let tiers = vec![
                tier("1", Some("9"), "100"),
                tier("10", Some("49"), "90"),
                tier("50", None, "80"),
            ];
            validate_tiers(&tiers).unwrap();

            let covering = tiers.iter().filter(|t| t.covers(quantity)).count();
            prop_assert!(covering <= 1);
        }
    }
}
