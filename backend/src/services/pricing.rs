//! Pricing resolver and price agreement lifecycle
//!
//! B2C orders always pay the catalog list price. B2B orders consult the
//! newest-approved active agreement for the (seller, buyer, product) triple
//! and pick the first tier covering the quantity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::{AgreementStatus, PriceAgreement, PriceTier};
use shared::types::OrderType;
use shared::validation::validate_tiers;

/// Pricing service for agreements and price resolution
#[derive(Clone)]
pub struct PricingService {
    db: PgPool,
}

/// Input for creating a draft agreement
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAgreementInput {
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub product_id: Uuid,
    #[validate(length(min = 1, message = "Agreement must have at least one tier"))]
    pub tiers: Vec<PriceTier>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Where a resolved price came from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PriceSource {
    ListPrice,
    Agreement { agreement_id: Uuid },
}

/// The unit price to charge for one order line
#[derive(Debug, Clone, Serialize)]
pub struct PriceResolution {
    pub unit_price: Decimal,
    pub source: PriceSource,
}

/// Database row for a price agreement
#[derive(Debug, FromRow)]
struct AgreementRow {
    id: Uuid,
    seller_id: Uuid,
    buyer_id: Uuid,
    product_id: Uuid,
    tiers: Json<Vec<PriceTier>>,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    status: String,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgreementRow {
    fn into_model(self) -> AppResult<PriceAgreement> {
        Ok(PriceAgreement {
            id: self.id,
            seller_id: self.seller_id,
            buyer_id: self.buyer_id,
            product_id: self.product_id,
            tiers: self.tiers.0,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            status: self.status.parse().map_err(AppError::Internal)?,
            approved_at: self.approved_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_AGREEMENT: &str = r#"
    SELECT id, seller_id, buyer_id, product_id, tiers, valid_from, valid_until,
           status, approved_at, created_at, updated_at
    FROM price_agreements
"#;

impl PricingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a draft agreement. Tiers are validated for ordering and
    /// overlaps up front; gaps are permitted and surface at resolve time.
    pub async fn create_agreement(
        &self,
        input: CreateAgreementInput,
    ) -> AppResult<PriceAgreement> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_tiers(&input.tiers).map_err(|e| AppError::Validation {
            field: "tiers".to_string(),
            message: e.to_string(),
        })?;
        if input.valid_until <= input.valid_from {
            return Err(AppError::Validation {
                field: "valid_until".to_string(),
                message: "Validity window must end after it starts".to_string(),
            });
        }

        let now = Utc::now();
        let agreement = PriceAgreement {
            id: Uuid::new_v4(),
            seller_id: input.seller_id,
            buyer_id: input.buyer_id,
            product_id: input.product_id,
            tiers: input.tiers,
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            status: AgreementStatus::Draft,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO price_agreements (
                id, seller_id, buyer_id, product_id, tiers, valid_from,
                valid_until, status, approved_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(agreement.id)
        .bind(agreement.seller_id)
        .bind(agreement.buyer_id)
        .bind(agreement.product_id)
        .bind(Json(&agreement.tiers))
        .bind(agreement.valid_from)
        .bind(agreement.valid_until)
        .bind(agreement.status.as_str())
        .bind(agreement.approved_at)
        .bind(agreement.created_at)
        .bind(agreement.updated_at)
        .execute(&self.db)
        .await?;

        Ok(agreement)
    }

    /// Get an agreement by id
    pub async fn get_agreement(&self, agreement_id: Uuid) -> AppResult<PriceAgreement> {
        let row = sqlx::query_as::<_, AgreementRow>(&format!("{SELECT_AGREEMENT} WHERE id = $1"))
            .bind(agreement_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Agreement".to_string()))?;
        row.into_model()
    }

    /// List agreements where the given party is seller or buyer
    pub async fn list_agreements_for(&self, party_id: Uuid) -> AppResult<Vec<PriceAgreement>> {
        let rows = sqlx::query_as::<_, AgreementRow>(&format!(
            "{SELECT_AGREEMENT} WHERE seller_id = $1 OR buyer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(party_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(AgreementRow::into_model).collect()
    }

    /// Submit a draft for approval
    pub async fn submit_agreement(&self, agreement_id: Uuid) -> AppResult<PriceAgreement> {
        self.transition_agreement(
            agreement_id,
            &[AgreementStatus::Draft],
            AgreementStatus::PendingApproval,
        )
        .await
    }

    /// Approve an agreement, activating it.
    ///
    /// At most one active agreement may exist per (seller, buyer, product)
    /// with an overlapping validity window; a second approval conflicts
    /// instead of leaving resolution to query order.
    pub async fn approve_agreement(&self, agreement_id: Uuid) -> AppResult<PriceAgreement> {
        let agreement = self.get_agreement(agreement_id).await?;
        if !matches!(
            agreement.status,
            AgreementStatus::Draft | AgreementStatus::PendingApproval
        ) {
            return Err(AppError::InvalidStateTransition(format!(
                "agreement is {}, expected draft or pending_approval",
                agreement.status.as_str()
            )));
        }

        let overlapping = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM price_agreements
                WHERE seller_id = $1 AND buyer_id = $2 AND product_id = $3
                  AND status = 'active' AND id <> $4
                  AND valid_from <= $6 AND valid_until >= $5
            )
            "#,
        )
        .bind(agreement.seller_id)
        .bind(agreement.buyer_id)
        .bind(agreement.product_id)
        .bind(agreement.id)
        .bind(agreement.valid_from)
        .bind(agreement.valid_until)
        .fetch_one(&self.db)
        .await?;

        if overlapping {
            return Err(AppError::Conflict(
                "an active agreement already covers this seller/buyer/product window".to_string(),
            ));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE price_agreements SET status = 'active', approved_at = $1, updated_at = $1 WHERE id = $2",
        )
        .bind(now)
        .bind(agreement_id)
        .execute(&self.db)
        .await?;

        self.get_agreement(agreement_id).await
    }

    /// Reject a pending agreement
    pub async fn reject_agreement(&self, agreement_id: Uuid) -> AppResult<PriceAgreement> {
        self.transition_agreement(
            agreement_id,
            &[AgreementStatus::Draft, AgreementStatus::PendingApproval],
            AgreementStatus::Rejected,
        )
        .await
    }

    /// Cancel an agreement that has not been rejected
    pub async fn cancel_agreement(&self, agreement_id: Uuid) -> AppResult<PriceAgreement> {
        self.transition_agreement(
            agreement_id,
            &[
                AgreementStatus::Draft,
                AgreementStatus::PendingApproval,
                AgreementStatus::Active,
            ],
            AgreementStatus::Cancelled,
        )
        .await
    }

    /// Resolve the unit price for one order line.
    ///
    /// `NoPricingTier` means a B2B agreement exists but no tier covers the
    /// quantity; the order assembler treats that as a list-price fallback,
    /// not a fatal error.
    pub async fn resolve_price(
        &self,
        seller_id: Uuid,
        buyer_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        order_type: OrderType,
        list_price: Decimal,
    ) -> AppResult<PriceResolution> {
        let mut conn = self.db.acquire().await?;
        self.resolve_price_on(
            &mut conn, seller_id, buyer_id, product_id, quantity, order_type, list_price,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn resolve_price_on(
        &self,
        conn: &mut PgConnection,
        seller_id: Uuid,
        buyer_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        order_type: OrderType,
        list_price: Decimal,
    ) -> AppResult<PriceResolution> {
        if order_type == OrderType::B2c {
            return Ok(PriceResolution {
                unit_price: list_price,
                source: PriceSource::ListPrice,
            });
        }

        let agreement = self
            .find_applicable_on(conn, seller_id, buyer_id, product_id)
            .await?;

        match agreement {
            None => Ok(PriceResolution {
                unit_price: list_price,
                source: PriceSource::ListPrice,
            }),
            Some(agreement) => {
                let unit_price = agreement.resolve_price(quantity)?;
                Ok(PriceResolution {
                    unit_price,
                    source: PriceSource::Agreement {
                        agreement_id: agreement.id,
                    },
                })
            }
        }
    }

    /// The currently applicable agreement for a triple, if any.
    /// Tie-break: most recently approved wins.
    async fn find_applicable_on(
        &self,
        conn: &mut PgConnection,
        seller_id: Uuid,
        buyer_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<PriceAgreement>> {
        let row = sqlx::query_as::<_, AgreementRow>(&format!(
            r#"{SELECT_AGREEMENT}
            WHERE seller_id = $1 AND buyer_id = $2 AND product_id = $3
              AND status = 'active'
              AND valid_from <= now() AND valid_until >= now()
            ORDER BY approved_at DESC
            LIMIT 1
            "#
        ))
        .bind(seller_id)
        .bind(buyer_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(AgreementRow::into_model).transpose()
    }

    /// Guarded status update shared by submit/reject/cancel
    async fn transition_agreement(
        &self,
        agreement_id: Uuid,
        allowed_from: &[AgreementStatus],
        to: AgreementStatus,
    ) -> AppResult<PriceAgreement> {
        let agreement = self.get_agreement(agreement_id).await?;
        if !allowed_from.contains(&agreement.status) {
            return Err(AppError::InvalidStateTransition(format!(
                "agreement is {}, cannot move to {}",
                agreement.status.as_str(),
                to.as_str()
            )));
        }

        sqlx::query("UPDATE price_agreements SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(to.as_str())
            .bind(Utc::now())
            .bind(agreement_id)
            .execute(&self.db)
            .await?;

        self.get_agreement(agreement_id).await
    }
}
