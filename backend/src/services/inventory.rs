//! Inventory ledger service
//!
//! Authoritative source of available stock. Each lot row carries its
//! reservations as an embedded JSONB document plus a `version` counter; every
//! mutation loads the aggregate, applies a pure operation from `shared`, and
//! writes the whole aggregate back with a conditional update on the version.
//! A lost race reloads and retries, so the reserved-quantity invariant holds
//! under concurrent writers.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{InventoryLot, LotError, QualityGrade, Reservation};
use shared::validation::validate_quantity;

/// Retries of the conditional update before giving up with a conflict
const MAX_LOT_RETRIES: u32 = 3;

/// How many candidate lots to try when placing a reservation
const CANDIDATE_LOT_LIMIT: i64 = 5;

/// Inventory service for lot registration and the reservation lifecycle
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    reservation_ttl: Duration,
}

/// Input for registering stock at intake
#[derive(Debug, Deserialize)]
pub struct RegisterLotInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity: Decimal,
    pub harvest_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub quality_grade: Option<QualityGrade>,
}

/// Database row for an inventory lot
#[derive(Debug, FromRow)]
struct LotRow {
    id: Uuid,
    product_id: Uuid,
    location_id: Uuid,
    total_quantity: Decimal,
    reserved_quantity: Decimal,
    harvest_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    quality_grade: String,
    reservations: Json<Vec<Reservation>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LotRow {
    fn into_model(self) -> AppResult<(InventoryLot, i64)> {
        let grade = self.quality_grade.parse().map_err(AppError::Internal)?;
        let lot = InventoryLot {
            id: self.id,
            product_id: self.product_id,
            location_id: self.location_id,
            total_quantity: self.total_quantity,
            reserved_quantity: self.reserved_quantity,
            harvest_date: self.harvest_date,
            expiry_date: self.expiry_date,
            quality_grade: grade,
            reservations: self.reservations.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok((lot, self.version))
    }
}

const SELECT_LOT: &str = r#"
    SELECT id, product_id, location_id, total_quantity, reserved_quantity,
           harvest_date, expiry_date, quality_grade, reservations, version,
           created_at, updated_at
    FROM inventory_lots
"#;

impl InventoryService {
    pub fn new(db: PgPool, reservation_ttl: Duration) -> Self {
        Self {
            db,
            reservation_ttl,
        }
    }

    /// Register a lot of stock (harvest or restock)
    pub async fn register_lot(&self, input: RegisterLotInput) -> AppResult<InventoryLot> {
        validate_quantity(input.quantity).map_err(|e| AppError::Validation {
            field: "quantity".to_string(),
            message: e.to_string(),
        })?;

        let lot = InventoryLot::new(
            input.product_id,
            input.location_id,
            input.quantity,
            input.harvest_date,
            input.expiry_date,
            input.quality_grade.unwrap_or_default(),
            Utc::now(),
        );

        sqlx::query(
            r#"
            INSERT INTO inventory_lots (
                id, product_id, location_id, total_quantity, reserved_quantity,
                harvest_date, expiry_date, quality_grade, reservations, version,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $11)
            "#,
        )
        .bind(lot.id)
        .bind(lot.product_id)
        .bind(lot.location_id)
        .bind(lot.total_quantity)
        .bind(lot.reserved_quantity)
        .bind(lot.harvest_date)
        .bind(lot.expiry_date)
        .bind(lot.quality_grade.as_str())
        .bind(Json(&lot.reservations))
        .bind(lot.created_at)
        .bind(lot.updated_at)
        .execute(&self.db)
        .await?;

        Ok(lot)
    }

    /// Get a lot by id
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<InventoryLot> {
        let row = sqlx::query_as::<_, LotRow>(&format!("{SELECT_LOT} WHERE id = $1"))
            .bind(lot_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;
        row.into_model().map(|(lot, _)| lot)
    }

    /// List lots holding a product
    pub async fn list_lots_for_product(&self, product_id: Uuid) -> AppResult<Vec<InventoryLot>> {
        let rows = sqlx::query_as::<_, LotRow>(&format!(
            "{SELECT_LOT} WHERE product_id = $1 ORDER BY expiry_date ASC NULLS LAST, harvest_date ASC"
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| row.into_model().map(|(lot, _)| lot))
            .collect()
    }

    /// Reserve `quantity` of a specific lot for an order (which may not be
    /// persisted yet). Returns the reservation id.
    pub async fn reserve(
        &self,
        lot_id: Uuid,
        order_id: Option<Uuid>,
        quantity: Decimal,
    ) -> AppResult<Uuid> {
        let mut conn = self.db.acquire().await?;
        self.reserve_on(&mut conn, lot_id, order_id, quantity).await
    }

    /// Transaction-aware variant of [`InventoryService::reserve`]
    pub async fn reserve_on(
        &self,
        conn: &mut PgConnection,
        lot_id: Uuid,
        order_id: Option<Uuid>,
        quantity: Decimal,
    ) -> AppResult<Uuid> {
        let ttl = self.reservation_ttl;
        self.mutate_lot_on(conn, lot_id, |lot| {
            lot.reserve(order_id, quantity, Utc::now(), ttl)
                .map_err(|e| enrich_lot_error(lot, e))
        })
        .await
    }

    /// Reserve `quantity` of `product_id` from whichever lot can satisfy it,
    /// preferring lots that expire first. Returns (lot id, reservation id).
    pub async fn reserve_for_product_on(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<(Uuid, Uuid)> {
        // Candidates: enough unreserved stock, or an overdue active
        // reservation the lazy sweep will release.
        let candidates = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM inventory_lots
            WHERE product_id = $1
              AND (
                  total_quantity - reserved_quantity >= $2
                  OR EXISTS (
                      SELECT 1 FROM jsonb_array_elements(reservations) r
                      WHERE r->>'status' = 'active'
                        AND (r->>'expires_at')::timestamptz <= now()
                  )
              )
            ORDER BY expiry_date ASC NULLS LAST, harvest_date ASC
            LIMIT $3
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(CANDIDATE_LOT_LIMIT)
        .fetch_all(&mut *conn)
        .await?;

        for lot_id in candidates {
            match self.reserve_on(conn, lot_id, None, quantity).await {
                Ok(reservation_id) => return Ok((lot_id, reservation_id)),
                Err(AppError::InsufficientStock(_)) => continue,
                Err(other) => return Err(other),
            }
        }

        Err(AppError::InsufficientStock(format!(
            "no lot can satisfy {quantity} of product {product_id}"
        )))
    }

    /// Attach a persisted order to a reservation made before the order row
    /// existed.
    pub async fn attach_order_on(
        &self,
        conn: &mut PgConnection,
        lot_id: Uuid,
        reservation_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<()> {
        self.mutate_lot_on(conn, lot_id, |lot| {
            lot.attach_order(reservation_id, order_id)
                .map_err(AppError::from)
        })
        .await
    }

    /// Confirm the reservation held for an order
    pub async fn confirm_reservation(&self, lot_id: Uuid, order_id: Uuid) -> AppResult<Uuid> {
        let mut conn = self.db.acquire().await?;
        self.confirm_reservation_on(&mut conn, lot_id, order_id).await
    }

    pub async fn confirm_reservation_on(
        &self,
        conn: &mut PgConnection,
        lot_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Uuid> {
        self.mutate_lot_on(conn, lot_id, |lot| {
            lot.confirm_reservation(order_id, Utc::now())
                .map_err(AppError::from)
        })
        .await
    }

    /// Cancel the reservation held for an order. Idempotent: reports whether
    /// anything was released, and a repeat call is a no-op.
    pub async fn cancel_reservation(&self, lot_id: Uuid, order_id: Uuid) -> AppResult<bool> {
        let mut conn = self.db.acquire().await?;
        self.cancel_reservation_on(&mut conn, lot_id, order_id).await
    }

    pub async fn cancel_reservation_on(
        &self,
        conn: &mut PgConnection,
        lot_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<bool> {
        self.mutate_lot_on(conn, lot_id, |lot| {
            Ok(lot.cancel_reservation(order_id, Utc::now()))
        })
        .await
    }

    /// Expire overdue reservations on one lot
    pub async fn sweep_lot(&self, lot_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conn = self.db.acquire().await?;
        self.mutate_lot_on(&mut conn, lot_id, |lot| Ok(lot.sweep_expired(Utc::now())))
            .await
    }

    /// Expire overdue reservations across all lots. Returns how many
    /// reservations were expired. Used by the periodic sweep job.
    pub async fn sweep_all_expired(&self) -> AppResult<usize> {
        let lot_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM inventory_lots
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(reservations) r
                WHERE r->>'status' = 'active'
                  AND (r->>'expires_at')::timestamptz <= now()
            )
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut expired = 0;
        for lot_id in lot_ids {
            expired += self.sweep_lot(lot_id).await?.len();
        }
        Ok(expired)
    }

    /// Load-apply-store loop with an optimistic version guard.
    ///
    /// `apply` must be a pure function of the lot; it can run more than once
    /// when another writer wins the race.
    async fn mutate_lot_on<T>(
        &self,
        conn: &mut PgConnection,
        lot_id: Uuid,
        mut apply: impl FnMut(&mut InventoryLot) -> AppResult<T>,
    ) -> AppResult<T> {
        for _ in 0..MAX_LOT_RETRIES {
            let row = sqlx::query_as::<_, LotRow>(&format!("{SELECT_LOT} WHERE id = $1"))
                .bind(lot_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;
            let (mut lot, version) = row.into_model()?;

            let value = apply(&mut lot)?;

            let updated = sqlx::query(
                r#"
                UPDATE inventory_lots
                SET reserved_quantity = $1, reservations = $2,
                    updated_at = $3, version = version + 1
                WHERE id = $4 AND version = $5
                "#,
            )
            .bind(lot.reserved_quantity)
            .bind(Json(&lot.reservations))
            .bind(lot.updated_at)
            .bind(lot_id)
            .bind(version)
            .execute(&mut *conn)
            .await?;

            if updated.rows_affected() == 1 {
                return Ok(value);
            }
            // Another writer advanced the version; reload and retry.
        }

        Err(AppError::Conflict(format!(
            "lot {lot_id} is being modified concurrently"
        )))
    }
}

/// Name the product when a reservation fails for lack of stock
fn enrich_lot_error(lot: &InventoryLot, err: LotError) -> AppError {
    match err {
        LotError::InsufficientStock {
            requested,
            available,
        } => AppError::InsufficientStock(format!(
            "product {}: requested {requested}, available {available} in lot {}",
            lot.product_id, lot.id
        )),
        other => AppError::from(other),
    }
}
