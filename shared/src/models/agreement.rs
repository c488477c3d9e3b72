//! Negotiated B2B price agreements with quantity tiers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised when resolving a price from an agreement
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("no pricing tier covers quantity {quantity}")]
    NoPricingTierForQuantity { quantity: Decimal },
}

/// Lifecycle of a price agreement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Draft,
    PendingApproval,
    Active,
    Expired,
    Cancelled,
    Rejected,
}

impl AgreementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementStatus::Draft => "draft",
            AgreementStatus::PendingApproval => "pending_approval",
            AgreementStatus::Active => "active",
            AgreementStatus::Expired => "expired",
            AgreementStatus::Cancelled => "cancelled",
            AgreementStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for AgreementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AgreementStatus::Draft),
            "pending_approval" => Ok(AgreementStatus::PendingApproval),
            "active" => Ok(AgreementStatus::Active),
            "expired" => Ok(AgreementStatus::Expired),
            "cancelled" => Ok(AgreementStatus::Cancelled),
            "rejected" => Ok(AgreementStatus::Rejected),
            other => Err(format!("unknown agreement status: {other}")),
        }
    }
}

/// A quantity range mapping to a unit price. Bounds are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceTier {
    pub min_quantity: Decimal,
    /// Open-ended tier when absent
    pub max_quantity: Option<Decimal>,
    pub unit_price: Decimal,
}

impl PriceTier {
    pub fn covers(&self, quantity: Decimal) -> bool {
        quantity >= self.min_quantity
            && self.max_quantity.map_or(true, |max| quantity <= max)
    }
}

/// A negotiated tiered price list between one seller and one buyer for one
/// product, valid over a time window.
///
/// Window expiry is computed at read time via [`PriceAgreement::is_applicable`];
/// the stored status never auto-transitions to `Expired`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAgreement {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub product_id: Uuid,
    pub tiers: Vec<PriceTier>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub status: AgreementStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PriceAgreement {
    /// Whether the agreement applies at `now`: approved and inside its
    /// validity window. Any non-active status never applies regardless of
    /// tiers.
    pub fn is_applicable(&self, now: DateTime<Utc>) -> bool {
        self.status == AgreementStatus::Active
            && self.valid_from <= now
            && now <= self.valid_until
    }

    /// First tier covering `quantity`, scanning in list order
    pub fn resolve_tier(&self, quantity: Decimal) -> Result<&PriceTier, PricingError> {
        self.tiers
            .iter()
            .find(|tier| tier.covers(quantity))
            .ok_or(PricingError::NoPricingTierForQuantity { quantity })
    }

    /// Unit price for `quantity` under this agreement
    pub fn resolve_price(&self, quantity: Decimal) -> Result<Decimal, PricingError> {
        self.resolve_tier(quantity).map(|tier| tier.unit_price)
    }
}
