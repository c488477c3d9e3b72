//! Recurring order schedules and the due-schedule runner
//!
//! The runner scans a bounded batch of due schedules each tick and drives the
//! order assembler for each one. Failures are captured on the schedule record
//! and never abort the batch; `next_run_at` only advances on success, so a
//! failed schedule is retried on the next tick.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::CatalogClient;
use crate::services::order::{CreateOrderInput, OrderItemRequest, OrderService};
use crate::services::pricing::PricingService;
use shared::models::{
    Frequency, LastRun, RecurringOrderSchedule, ScheduleStatus, TemplateItem,
};
use shared::types::{DeliveryAddress, OrderType};
use shared::validation::validate_template_items;

/// Recurring schedule service
#[derive(Clone)]
pub struct ScheduleService {
    db: PgPool,
    catalog: CatalogClient,
    pricing: PricingService,
}

/// Input for creating a schedule
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleInput {
    pub buyer_id: Uuid,
    pub order_type: OrderType,
    #[validate(length(min = 1, message = "Schedule must have at least one item"))]
    pub items: Vec<TemplateItem>,
    pub delivery_address: DeliveryAddress,
    pub frequency: Frequency,
    pub custom_interval_days: Option<i64>,
    /// When the first order should be generated
    pub start_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Outcome of one runner tick
#[derive(Debug, Default, serde::Serialize)]
pub struct ScheduleRunReport {
    pub scanned: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Database row for a schedule
#[derive(Debug, FromRow)]
struct ScheduleRow {
    id: Uuid,
    buyer_id: Uuid,
    order_type: String,
    items: Json<Vec<TemplateItem>>,
    delivery_address: Json<DeliveryAddress>,
    frequency: String,
    custom_interval_days: Option<i64>,
    next_run_at: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    status: String,
    last_run: Option<Json<LastRun>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ScheduleRow {
    fn into_model(self) -> AppResult<RecurringOrderSchedule> {
        Ok(RecurringOrderSchedule {
            id: self.id,
            buyer_id: self.buyer_id,
            order_type: self.order_type.parse().map_err(AppError::Internal)?,
            items: self.items.0,
            delivery_address: self.delivery_address.0,
            frequency: self.frequency.parse().map_err(AppError::Internal)?,
            custom_interval_days: self.custom_interval_days,
            next_run_at: self.next_run_at,
            end_date: self.end_date,
            status: self.status.parse().map_err(AppError::Internal)?,
            last_run: self.last_run.map(|j| j.0),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_SCHEDULE: &str = r#"
    SELECT id, buyer_id, order_type, items, delivery_address, frequency,
           custom_interval_days, next_run_at, end_date, status, last_run,
           created_at, updated_at
    FROM recurring_order_schedules
"#;

impl ScheduleService {
    pub fn new(db: PgPool, catalog: CatalogClient) -> Self {
        let pricing = PricingService::new(db.clone());
        Self {
            db,
            catalog,
            pricing,
        }
    }

    /// Create a schedule. The first run fires at `start_at`.
    pub async fn create_schedule(
        &self,
        input: CreateScheduleInput,
    ) -> AppResult<RecurringOrderSchedule> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_template_items(&input.items).map_err(|e| AppError::Validation {
            field: "items".to_string(),
            message: e.to_string(),
        })?;
        if input.frequency == Frequency::Custom && input.custom_interval_days.is_none() {
            return Err(AppError::Validation {
                field: "custom_interval_days".to_string(),
                message: "Custom frequency requires an interval in days".to_string(),
            });
        }

        let now = Utc::now();
        let schedule = RecurringOrderSchedule {
            id: Uuid::new_v4(),
            buyer_id: input.buyer_id,
            order_type: input.order_type,
            items: input.items,
            delivery_address: input.delivery_address,
            frequency: input.frequency,
            custom_interval_days: input.custom_interval_days,
            next_run_at: input.start_at,
            end_date: input.end_date,
            status: ScheduleStatus::Active,
            last_run: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO recurring_order_schedules (
                id, buyer_id, order_type, items, delivery_address, frequency,
                custom_interval_days, next_run_at, end_date, status, last_run,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.buyer_id)
        .bind(schedule.order_type.as_str())
        .bind(Json(&schedule.items))
        .bind(Json(&schedule.delivery_address))
        .bind(schedule.frequency.as_str())
        .bind(schedule.custom_interval_days)
        .bind(schedule.next_run_at)
        .bind(schedule.end_date)
        .bind(schedule.status.as_str())
        .bind(schedule.last_run.as_ref().map(Json))
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .execute(&self.db)
        .await?;

        Ok(schedule)
    }

    /// Get a schedule by id
    pub async fn get_schedule(&self, schedule_id: Uuid) -> AppResult<RecurringOrderSchedule> {
        let row = sqlx::query_as::<_, ScheduleRow>(&format!("{SELECT_SCHEDULE} WHERE id = $1"))
            .bind(schedule_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Schedule".to_string()))?;
        row.into_model()
    }

    /// List a buyer's schedules
    pub async fn list_schedules_for_buyer(
        &self,
        buyer_id: Uuid,
    ) -> AppResult<Vec<RecurringOrderSchedule>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "{SELECT_SCHEDULE} WHERE buyer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(buyer_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(ScheduleRow::into_model).collect()
    }

    pub async fn pause_schedule(&self, schedule_id: Uuid) -> AppResult<RecurringOrderSchedule> {
        let mut schedule = self.get_schedule(schedule_id).await?;
        schedule.pause(Utc::now())?;
        self.store(&schedule).await?;
        Ok(schedule)
    }

    pub async fn resume_schedule(&self, schedule_id: Uuid) -> AppResult<RecurringOrderSchedule> {
        let mut schedule = self.get_schedule(schedule_id).await?;
        schedule.resume(Utc::now())?;
        self.store(&schedule).await?;
        Ok(schedule)
    }

    pub async fn cancel_schedule(&self, schedule_id: Uuid) -> AppResult<RecurringOrderSchedule> {
        let mut schedule = self.get_schedule(schedule_id).await?;
        schedule.cancel(Utc::now())?;
        self.store(&schedule).await?;
        Ok(schedule)
    }

    /// Scan up to `limit` due schedules and drive the order assembler for
    /// each, isolating failures per schedule.
    pub async fn run_due_schedules(
        &self,
        orders: &OrderService,
        limit: i64,
    ) -> AppResult<ScheduleRunReport> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"{SELECT_SCHEDULE}
            WHERE status = 'active' AND next_run_at <= now()
            ORDER BY next_run_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let mut report = ScheduleRunReport {
            scanned: rows.len(),
            ..Default::default()
        };

        for row in rows {
            let mut schedule = match row.into_model() {
                Ok(schedule) => schedule,
                Err(err) => {
                    tracing::error!("skipping undecodable schedule: {err}");
                    report.failed += 1;
                    continue;
                }
            };

            let now = Utc::now();
            match self.run_one(orders, &schedule).await {
                Ok(order_id) => match schedule.record_success(now, order_id) {
                    Ok(()) => {
                        report.succeeded += 1;
                        tracing::info!(schedule_id = %schedule.id, %order_id, "schedule run succeeded");
                    }
                    Err(err) => {
                        schedule.record_failure(now, err.to_string());
                        report.failed += 1;
                        tracing::warn!(schedule_id = %schedule.id, "could not advance schedule: {err}");
                    }
                },
                Err(err) => {
                    schedule.record_failure(now, err.to_string());
                    report.failed += 1;
                    tracing::warn!(schedule_id = %schedule.id, "schedule run failed: {err}");
                }
            }
            // A store failure must not take down the rest of the batch;
            // next_run_at is untouched in the database, so the schedule is
            // simply picked up again on the next tick.
            if let Err(err) = self.store(&schedule).await {
                tracing::error!(schedule_id = %schedule.id, "could not persist schedule outcome: {err}");
            }
        }

        Ok(report)
    }

    /// Execute one schedule: price-cap precheck, then order assembly.
    async fn run_one(
        &self,
        orders: &OrderService,
        schedule: &RecurringOrderSchedule,
    ) -> AppResult<Uuid> {
        let mut seller_id: Option<Uuid> = None;
        let mut items = Vec::with_capacity(schedule.items.len());

        for item in &schedule.items {
            let product = match self.catalog.get_product(item.product_id).await {
                Ok(product) => product,
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::ProductUnavailable(format!(
                        "product {} does not exist",
                        item.product_id
                    )))
                }
                Err(other) => return Err(other),
            };
            if !product.is_sellable() {
                return Err(AppError::ProductUnavailable(format!(
                    "product {} is {}",
                    product.id, product.status
                )));
            }

            // A schedule generates one order, which has one seller.
            match seller_id {
                None => seller_id = Some(product.owner_id),
                Some(seller) if seller != product.owner_id => {
                    return Err(AppError::ValidationError(
                        "schedule items span multiple sellers".to_string(),
                    ))
                }
                Some(_) => {}
            }

            // Honor the line's price cap against the currently resolved
            // price; a cap breach fails the whole run.
            if let Some(cap) = item.max_unit_price {
                let current = match self
                    .pricing
                    .resolve_price(
                        product.owner_id,
                        schedule.buyer_id,
                        item.product_id,
                        item.quantity,
                        schedule.order_type,
                        product.base_price,
                    )
                    .await
                {
                    Ok(resolution) => resolution.unit_price,
                    Err(AppError::NoPricingTier(_)) => product.base_price,
                    Err(other) => return Err(other),
                };
                if current > cap {
                    return Err(AppError::ValidationError(format!(
                        "current price {current} exceeds cap {cap} for product {}",
                        item.product_id
                    )));
                }
            }

            items.push(OrderItemRequest {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        let seller_id = seller_id.ok_or_else(|| {
            AppError::ValidationError("schedule has no items".to_string())
        })?;

        let created = orders
            .create_order(CreateOrderInput {
                order_type: schedule.order_type,
                buyer_id: schedule.buyer_id,
                seller_id,
                items,
                delivery_address: schedule.delivery_address.clone(),
                payment_terms: None,
            })
            .await?;

        Ok(created.order.id)
    }

    /// Persist the aggregate's mutable fields as a whole
    async fn store(&self, schedule: &RecurringOrderSchedule) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE recurring_order_schedules
            SET next_run_at = $1, status = $2, last_run = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(schedule.next_run_at)
        .bind(schedule.status.as_str())
        .bind(schedule.last_run.as_ref().map(Json))
        .bind(schedule.updated_at)
        .bind(schedule.id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
