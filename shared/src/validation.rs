//! Validation utilities for the AgriMarket Order Core

use rust_decimal::Decimal;

use crate::models::{PriceTier, TemplateItem};

// ============================================================================
// Price Agreement Validations
// ============================================================================

/// Validate a tier list at agreement-creation time.
///
/// Tiers must be non-empty, positively priced, internally consistent
/// (min <= max), sorted ascending by minimum quantity, and non-overlapping.
/// Gaps between tiers are allowed; a quantity falling in a gap surfaces as
/// `NoPricingTierForQuantity` at resolve time.
pub fn validate_tiers(tiers: &[PriceTier]) -> Result<(), &'static str> {
    if tiers.is_empty() {
        return Err("Agreement must have at least one tier");
    }
    for tier in tiers {
        if tier.min_quantity < Decimal::ZERO {
            return Err("Tier minimum quantity cannot be negative");
        }
        if tier.unit_price <= Decimal::ZERO {
            return Err("Tier price must be positive");
        }
        if let Some(max) = tier.max_quantity {
            if max < tier.min_quantity {
                return Err("Tier maximum quantity cannot be below its minimum");
            }
        }
    }
    for pair in tiers.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.min_quantity <= prev.min_quantity {
            return Err("Tiers must be sorted ascending by minimum quantity");
        }
        match prev.max_quantity {
            None => return Err("Only the last tier may be open-ended"),
            Some(max) if next.min_quantity <= max => {
                return Err("Tier quantity ranges must not overlap")
            }
            Some(_) => {}
        }
    }
    Ok(())
}

// ============================================================================
// Order / Schedule Validations
// ============================================================================

/// Validate a requested quantity
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a schedule's item template
pub fn validate_template_items(items: &[TemplateItem]) -> Result<(), &'static str> {
    if items.is_empty() {
        return Err("Schedule must have at least one item");
    }
    for item in items {
        validate_quantity(item.quantity)?;
        if let Some(cap) = item.max_unit_price {
            if cap <= Decimal::ZERO {
                return Err("Price cap must be positive");
            }
        }
    }
    Ok(())
}
