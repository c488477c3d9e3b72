//! Commission ledger service
//!
//! Tracks platform revenue and seller payout independently of order status.
//! The record is created in the same transaction as its order; settlement
//! transitions and adjustments arrive later from operator workflows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{Adjustment, AdjustmentType, Commission, CommissionStatus};

/// Commission service
#[derive(Clone)]
pub struct CommissionService {
    db: PgPool,
}

/// Input for appending an adjustment
#[derive(Debug, Deserialize)]
pub struct AddAdjustmentInput {
    pub adjustment_type: AdjustmentType,
    pub amount: Decimal,
    pub reason: String,
}

/// Database row for a commission
#[derive(Debug, FromRow)]
struct CommissionRow {
    id: Uuid,
    order_id: Uuid,
    seller_id: Uuid,
    seller_type: String,
    order_amount: Decimal,
    commission_rate: Decimal,
    commission_amount: Decimal,
    seller_payout: Decimal,
    status: String,
    adjustments: Json<Vec<Adjustment>>,
    collected_at: Option<DateTime<Utc>>,
    processing_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CommissionRow {
    fn into_model(self) -> AppResult<Commission> {
        Ok(Commission {
            id: self.id,
            order_id: self.order_id,
            seller_id: self.seller_id,
            seller_type: self.seller_type.parse().map_err(AppError::Internal)?,
            order_amount: self.order_amount,
            commission_rate: self.commission_rate,
            commission_amount: self.commission_amount,
            seller_payout: self.seller_payout,
            status: self.status.parse().map_err(AppError::Internal)?,
            adjustments: self.adjustments.0,
            collected_at: self.collected_at,
            processing_at: self.processing_at,
            paid_at: self.paid_at,
            failed_at: self.failed_at,
            refunded_at: self.refunded_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COMMISSION: &str = r#"
    SELECT id, order_id, seller_id, seller_type, order_amount, commission_rate,
           commission_amount, seller_payout, status, adjustments, collected_at,
           processing_at, paid_at, failed_at, refunded_at, created_at, updated_at
    FROM commissions
"#;

impl CommissionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert a freshly derived commission inside the order's transaction
    pub async fn insert_on(
        &self,
        conn: &mut PgConnection,
        commission: &Commission,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO commissions (
                id, order_id, seller_id, seller_type, order_amount,
                commission_rate, commission_amount, seller_payout, status,
                adjustments, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(commission.id)
        .bind(commission.order_id)
        .bind(commission.seller_id)
        .bind(commission.seller_type.as_str())
        .bind(commission.order_amount)
        .bind(commission.commission_rate)
        .bind(commission.commission_amount)
        .bind(commission.seller_payout)
        .bind(commission.status.as_str())
        .bind(Json(&commission.adjustments))
        .bind(commission.created_at)
        .bind(commission.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Get a commission by id
    pub async fn get(&self, commission_id: Uuid) -> AppResult<Commission> {
        let row = sqlx::query_as::<_, CommissionRow>(&format!("{SELECT_COMMISSION} WHERE id = $1"))
            .bind(commission_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Commission".to_string()))?;
        row.into_model()
    }

    /// Get the commission derived from an order
    pub async fn get_by_order(&self, order_id: Uuid) -> AppResult<Commission> {
        let row = sqlx::query_as::<_, CommissionRow>(&format!(
            "{SELECT_COMMISSION} WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Commission".to_string()))?;
        row.into_model()
    }

    /// List commissions owed by a seller
    pub async fn list_for_seller(&self, seller_id: Uuid) -> AppResult<Vec<Commission>> {
        let rows = sqlx::query_as::<_, CommissionRow>(&format!(
            "{SELECT_COMMISSION} WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(CommissionRow::into_model).collect()
    }

    /// Advance the settlement state
    pub async fn transition(
        &self,
        commission_id: Uuid,
        to: CommissionStatus,
    ) -> AppResult<Commission> {
        let mut commission = self.get(commission_id).await?;
        commission.transition(to, Utc::now())?;
        self.store(&commission).await?;
        Ok(commission)
    }

    /// Append an adjustment, recomputing the payout
    pub async fn add_adjustment(
        &self,
        commission_id: Uuid,
        input: AddAdjustmentInput,
    ) -> AppResult<Commission> {
        if input.amount == Decimal::ZERO {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: "Adjustment amount cannot be zero".to_string(),
            });
        }
        // Corrections carry their own sign; the other kinds are magnitudes.
        if input.adjustment_type != AdjustmentType::Correction && input.amount < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "amount".to_string(),
                message: "Adjustment amount must be positive".to_string(),
            });
        }

        let mut commission = self.get(commission_id).await?;
        commission.add_adjustment(input.adjustment_type, input.amount, input.reason, Utc::now())?;
        self.store(&commission).await?;
        Ok(commission)
    }

    /// Persist the aggregate's mutable fields as a whole
    async fn store(&self, commission: &Commission) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE commissions
            SET seller_payout = $1, status = $2, adjustments = $3,
                collected_at = $4, processing_at = $5, paid_at = $6,
                failed_at = $7, refunded_at = $8, updated_at = $9
            WHERE id = $10
            "#,
        )
        .bind(commission.seller_payout)
        .bind(commission.status.as_str())
        .bind(Json(&commission.adjustments))
        .bind(commission.collected_at)
        .bind(commission.processing_at)
        .bind(commission.paid_at)
        .bind(commission.failed_at)
        .bind(commission.refunded_at)
        .bind(commission.updated_at)
        .bind(commission.id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
