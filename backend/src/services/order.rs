//! Order assembler
//!
//! Orchestrates multi-item order creation as a single unit of work: price
//! resolution, inventory reservation, charge computation, and the paired
//! commission record all commit together or not at all. The whole batch runs
//! inside one database transaction, so a failure on any line rolls back every
//! reservation made for earlier lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::CatalogClient;
use crate::services::commission::CommissionService;
use crate::services::inventory::InventoryService;
use crate::services::pricing::PricingService;
use shared::models::{
    generate_order_number, Commission, FeePolicy, Order, OrderCharges, OrderLine, OrderStatus,
    SellerType,
};
use shared::types::{DeliveryAddress, OrderType, PaymentTerms};
use shared::validation::validate_quantity;

/// Order assembly service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    catalog: CatalogClient,
    pricing: PricingService,
    inventory: InventoryService,
    commissions: CommissionService,
    policy: FeePolicy,
}

/// One requested line of a new order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// Input for assembling an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub order_type: OrderType,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    #[validate(length(min = 1, message = "Order must have at least one item"))]
    pub items: Vec<OrderItemRequest>,
    pub delivery_address: DeliveryAddress,
    pub payment_terms: Option<PaymentTerms>,
}

/// Commission summary returned alongside a created order
#[derive(Debug, Clone, Serialize)]
pub struct CommissionBreakdown {
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub seller_payout: Decimal,
}

/// A persisted order plus its commission breakdown
#[derive(Debug, Serialize)]
pub struct CreatedOrder {
    pub order: Order,
    pub commission: CommissionBreakdown,
}

/// Database row for an order
#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    order_type: String,
    buyer_id: Uuid,
    seller_id: Uuid,
    lines: Json<Vec<OrderLine>>,
    subtotal: Decimal,
    delivery_fee: Decimal,
    tax: Decimal,
    total: Decimal,
    status: String,
    delivery_address: Json<DeliveryAddress>,
    payment_terms: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_model(self) -> AppResult<Order> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            order_type: self.order_type.parse().map_err(AppError::Internal)?,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            lines: self.lines.0,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            tax: self.tax,
            total: self.total,
            status: self.status.parse().map_err(AppError::Internal)?,
            delivery_address: self.delivery_address.0,
            payment_terms: self.payment_terms.parse().map_err(AppError::Internal)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_ORDER: &str = r#"
    SELECT id, order_number, order_type, buyer_id, seller_id, lines, subtotal,
           delivery_fee, tax, total, status, delivery_address, payment_terms,
           created_at, updated_at
    FROM orders
"#;

impl OrderService {
    pub fn new(
        db: PgPool,
        catalog: CatalogClient,
        inventory: InventoryService,
        policy: FeePolicy,
    ) -> Self {
        let pricing = PricingService::new(db.clone());
        let commissions = CommissionService::new(db.clone());
        Self {
            db,
            catalog,
            pricing,
            inventory,
            commissions,
            policy,
        }
    }

    /// Assemble and persist an order, all-or-nothing across its items.
    pub async fn create_order(&self, input: CreateOrderInput) -> AppResult<CreatedOrder> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        for item in &input.items {
            validate_quantity(item.quantity).map_err(|e| AppError::Validation {
                field: "quantity".to_string(),
                message: e.to_string(),
            })?;
        }
        // One reservation per (lot, order) pair: a product appearing twice
        // would collide on its lot, so lines must be pre-merged by the caller.
        for (i, item) in input.items.iter().enumerate() {
            if input.items[..i].iter().any(|p| p.product_id == item.product_id) {
                return Err(AppError::ValidationError(format!(
                    "duplicate product {} in order items",
                    item.product_id
                )));
            }
        }

        // Catalog lookups happen before the transaction; they are read-only
        // against an external service.
        let mut products = Vec::with_capacity(input.items.len());
        let mut seller_type = SellerType::default();
        for item in &input.items {
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
            if product.owner_id != input.seller_id {
                return Err(AppError::ValidationError(format!(
                    "product {} does not belong to seller {}",
                    product.id, input.seller_id
                )));
            }
            seller_type = product.owner_type;
            products.push(product);
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // Resolve prices and reserve stock line by line. Any failure from
        // here on drops the transaction and with it every reservation made
        // for earlier lines.
        let mut lines = Vec::with_capacity(input.items.len());
        let mut reservations = Vec::with_capacity(input.items.len());
        for (item, product) in input.items.iter().zip(&products) {
            let resolution = match self
                .pricing
                .resolve_price_on(
                    &mut tx,
                    input.seller_id,
                    input.buyer_id,
                    item.product_id,
                    item.quantity,
                    input.order_type,
                    product.base_price,
                )
                .await
            {
                Ok(resolution) => resolution,
                // A tier mismatch is not fatal to the purchase; charge the
                // list price instead.
                Err(AppError::NoPricingTier(_)) => crate::services::pricing::PriceResolution {
                    unit_price: product.base_price,
                    source: crate::services::pricing::PriceSource::ListPrice,
                },
                Err(other) => return Err(other),
            };

            let (lot_id, reservation_id) = self
                .inventory
                .reserve_for_product_on(&mut tx, item.product_id, item.quantity)
                .await?;

            lines.push(OrderLine::new(
                product.id,
                product.name.clone(),
                product.unit.clone(),
                item.quantity,
                resolution.unit_price,
                lot_id,
            ));
            reservations.push((lot_id, reservation_id));
        }

        let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
        let charges = OrderCharges::compute(subtotal, input.order_type, &self.policy);

        let sequence: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let order = Order {
            id: Uuid::new_v4(),
            order_number: generate_order_number(input.order_type, now.date_naive(), sequence),
            order_type: input.order_type,
            buyer_id: input.buyer_id,
            seller_id: input.seller_id,
            lines,
            subtotal: charges.subtotal,
            delivery_fee: charges.delivery_fee,
            tax: charges.tax,
            total: charges.total,
            status: OrderStatus::Pending,
            delivery_address: input.delivery_address,
            payment_terms: input.payment_terms.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, order_type, buyer_id, seller_id, lines,
                subtotal, delivery_fee, tax, total, status, delivery_address,
                payment_terms, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.order_type.as_str())
        .bind(order.buyer_id)
        .bind(order.seller_id)
        .bind(Json(&order.lines))
        .bind(order.subtotal)
        .bind(order.delivery_fee)
        .bind(order.tax)
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(Json(&order.delivery_address))
        .bind(order.payment_terms.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        // Reservations were made before the order row existed; attach its
        // identity retroactively.
        for (lot_id, reservation_id) in &reservations {
            self.inventory
                .attach_order_on(&mut tx, *lot_id, *reservation_id, order.id)
                .await?;
        }

        let commission = Commission::for_order(
            order.id,
            order.seller_id,
            seller_type,
            order.total,
            self.policy.commission_rate(order.order_type),
            now,
        );
        self.commissions.insert_on(&mut tx, &commission).await?;

        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            total = %order.total,
            "order created"
        );

        Ok(CreatedOrder {
            order,
            commission: CommissionBreakdown {
                commission_rate: commission.commission_rate,
                commission_amount: commission.commission_amount,
                seller_payout: commission.seller_payout,
            },
        })
    }

    /// Get an order by id
    pub async fn get_order(&self, order_id: Uuid) -> AppResult<Order> {
        let mut conn = self.db.acquire().await?;
        self.get_order_on(&mut conn, order_id).await
    }

    async fn get_order_on(&self, conn: &mut PgConnection, order_id: Uuid) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        row.into_model()
    }

    /// List orders placed by a buyer
    pub async fn list_orders_for_buyer(&self, buyer_id: Uuid) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE buyer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(buyer_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(OrderRow::into_model).collect()
    }

    /// List orders received by a seller
    pub async fn list_orders_for_seller(&self, seller_id: Uuid) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(OrderRow::into_model).collect()
    }

    /// Confirm a pending order: every line's reservation becomes permanent
    /// and stops expiring.
    pub async fn confirm_order(&self, order_id: Uuid) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let order = self.get_order_on(&mut tx, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "order is {}, expected pending",
                order.status.as_str()
            )));
        }

        for line in &order.lines {
            self.inventory
                .confirm_reservation_on(&mut tx, line.lot_id, order_id)
                .await?;
        }
        let updated = self
            .update_status_on(&mut tx, order_id, OrderStatus::Confirmed)
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Cancel a pending order, releasing its reservations. Reservations that
    /// already expired are simply skipped.
    pub async fn cancel_order(&self, order_id: Uuid) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let order = self.get_order_on(&mut tx, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "order is {}, expected pending",
                order.status.as_str()
            )));
        }

        for line in &order.lines {
            self.inventory
                .cancel_reservation_on(&mut tx, line.lot_id, order_id)
                .await?;
        }
        let updated = self
            .update_status_on(&mut tx, order_id, OrderStatus::Cancelled)
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn update_status_on(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        status: OrderStatus,
    ) -> AppResult<Order> {
        sqlx::query("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(order_id)
            .execute(&mut *conn)
            .await?;
        self.get_order_on(conn, order_id).await
    }
}
