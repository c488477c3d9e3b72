//! Platform commission and seller payout ledger
//!
//! One commission record per successful order. The settlement lifecycle runs
//! independently of the order status, and the payout is recomputed from the
//! full adjustment list on every append so it is always deterministic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommissionError {
    #[error("invalid commission transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("adjustments cannot be applied once the payout is {status}")]
    AdjustmentAfterPayout { status: String },
}

/// Settlement state of a commission record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Collected,
    Processing,
    Paid,
    Failed,
    Refunded,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Collected => "collected",
            CommissionStatus::Processing => "processing",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Failed => "failed",
            CommissionStatus::Refunded => "refunded",
        }
    }

    /// Which transitions the settlement workflow allows:
    /// pending -> collected -> processing -> paid, with failed reachable from
    /// processing and refunded reachable from paid.
    fn can_transition_to(&self, to: CommissionStatus) -> bool {
        matches!(
            (self, to),
            (CommissionStatus::Pending, CommissionStatus::Collected)
                | (CommissionStatus::Collected, CommissionStatus::Processing)
                | (CommissionStatus::Processing, CommissionStatus::Paid)
                | (CommissionStatus::Processing, CommissionStatus::Failed)
                | (CommissionStatus::Paid, CommissionStatus::Refunded)
        )
    }
}

impl std::str::FromStr for CommissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CommissionStatus::Pending),
            "collected" => Ok(CommissionStatus::Collected),
            "processing" => Ok(CommissionStatus::Processing),
            "paid" => Ok(CommissionStatus::Paid),
            "failed" => Ok(CommissionStatus::Failed),
            "refunded" => Ok(CommissionStatus::Refunded),
            other => Err(format!("unknown commission status: {other}")),
        }
    }
}

/// Who the seller is on the platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SellerType {
    #[default]
    Farmer,
    Business,
}

impl SellerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellerType::Farmer => "farmer",
            SellerType::Business => "business",
        }
    }
}

impl std::str::FromStr for SellerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(SellerType::Farmer),
            "business" => Ok(SellerType::Business),
            other => Err(format!("unknown seller type: {other}")),
        }
    }
}

/// Manual correction applied to a payout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Refund,
    Penalty,
    Bonus,
    Correction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub adjustment_type: AdjustmentType,
    pub amount: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Adjustment {
    /// Signed effect on the seller payout: bonuses add, refunds and penalties
    /// subtract, corrections carry their own sign.
    pub fn payout_delta(&self) -> Decimal {
        match self.adjustment_type {
            AdjustmentType::Bonus => self.amount,
            AdjustmentType::Refund | AdjustmentType::Penalty => -self.amount,
            AdjustmentType::Correction => self.amount,
        }
    }
}

/// Derived financial record, one-to-one with a successful order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    pub id: Uuid,
    pub order_id: Uuid,
    pub seller_id: Uuid,
    pub seller_type: SellerType,
    pub order_amount: Decimal,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub seller_payout: Decimal,
    pub status: CommissionStatus,
    pub adjustments: Vec<Adjustment>,
    pub collected_at: Option<DateTime<Utc>>,
    pub processing_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Commission {
    /// Derive the record for a freshly assembled order
    pub fn for_order(
        order_id: Uuid,
        seller_id: Uuid,
        seller_type: SellerType,
        order_amount: Decimal,
        commission_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let commission_amount = (order_amount * commission_rate).round_dp(2);
        Self {
            id: Uuid::new_v4(),
            order_id,
            seller_id,
            seller_type,
            order_amount,
            commission_rate,
            commission_amount,
            seller_payout: order_amount - commission_amount,
            status: CommissionStatus::Pending,
            adjustments: Vec::new(),
            collected_at: None,
            processing_at: None,
            paid_at: None,
            failed_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the settlement state, stamping the transition time
    pub fn transition(
        &mut self,
        to: CommissionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), CommissionError> {
        if !self.status.can_transition_to(to) {
            return Err(CommissionError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.status = to;
        match to {
            CommissionStatus::Collected => self.collected_at = Some(now),
            CommissionStatus::Processing => self.processing_at = Some(now),
            CommissionStatus::Paid => self.paid_at = Some(now),
            CommissionStatus::Failed => self.failed_at = Some(now),
            CommissionStatus::Refunded => self.refunded_at = Some(now),
            CommissionStatus::Pending => {}
        }
        self.updated_at = now;
        Ok(())
    }

    /// Append an adjustment and recompute the payout from scratch.
    ///
    /// Allowed at any state before the payout is final.
    pub fn add_adjustment(
        &mut self,
        adjustment_type: AdjustmentType,
        amount: Decimal,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), CommissionError> {
        if matches!(self.status, CommissionStatus::Paid | CommissionStatus::Refunded) {
            return Err(CommissionError::AdjustmentAfterPayout {
                status: self.status.as_str().to_string(),
            });
        }
        self.adjustments.push(Adjustment {
            adjustment_type,
            amount,
            reason,
            created_at: now,
        });
        self.seller_payout = self.recomputed_payout();
        self.updated_at = now;
        Ok(())
    }

    /// Payout derived from the order amount, commission, and the full
    /// adjustment list
    pub fn recomputed_payout(&self) -> Decimal {
        self.adjustments
            .iter()
            .fold(self.order_amount - self.commission_amount, |acc, adj| {
                acc + adj.payout_delta()
            })
    }
}
