//! Order snapshot and charge computation
//!
//! An order is immutable after creation: line prices, fees, tax, and total
//! are computed once by the assembler and never recomputed, regardless of
//! later status changes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DeliveryAddress, OrderType, PaymentTerms};

/// Delivery/payment progress of an order; advanced by workflows outside the
/// order core.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// One line of an order: a snapshot of the product at purchase time plus the
/// lot the stock was reserved from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub lot_id: Uuid,
}

impl OrderLine {
    pub fn new(
        product_id: Uuid,
        product_name: String,
        unit: String,
        quantity: Decimal,
        unit_price: Decimal,
        lot_id: Uuid,
    ) -> Self {
        Self {
            product_id,
            product_name,
            unit,
            quantity,
            unit_price,
            line_total: (quantity * unit_price).round_dp(2),
            lot_id,
        }
    }
}

/// Platform fee policy applied at order creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Flat delivery fee for consumer orders; B2B delivery is free
    pub b2c_delivery_fee: Decimal,
    /// Tax as a fraction of the subtotal
    pub tax_rate: Decimal,
    pub b2c_commission_rate: Decimal,
    pub b2b_commission_rate: Decimal,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            b2c_delivery_fee: Decimal::new(50, 0),
            tax_rate: Decimal::new(7, 2),
            b2c_commission_rate: Decimal::new(10, 2),
            b2b_commission_rate: Decimal::new(5, 2),
        }
    }
}

impl FeePolicy {
    pub fn delivery_fee(&self, order_type: OrderType) -> Decimal {
        match order_type {
            OrderType::B2c => self.b2c_delivery_fee,
            OrderType::B2b => Decimal::ZERO,
        }
    }

    pub fn commission_rate(&self, order_type: OrderType) -> Decimal {
        match order_type {
            OrderType::B2c => self.b2c_commission_rate,
            OrderType::B2b => self.b2b_commission_rate,
        }
    }
}

/// Charges derived from a subtotal, computed once at creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderCharges {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderCharges {
    pub fn compute(subtotal: Decimal, order_type: OrderType, policy: &FeePolicy) -> Self {
        let delivery_fee = policy.delivery_fee(order_type);
        let tax = (subtotal * policy.tax_rate).round_dp(2);
        Self {
            subtotal,
            delivery_fee,
            tax,
            total: subtotal + delivery_fee + tax,
        }
    }
}

/// An immutable-after-creation purchase snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub order_type: OrderType,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub delivery_address: DeliveryAddress,
    pub payment_terms: PaymentTerms,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generate an order number, e.g. "ORD-B2B-20260831-0042"
pub fn generate_order_number(order_type: OrderType, date: NaiveDate, sequence: i64) -> String {
    format!(
        "ORD-{}-{}-{:04}",
        order_type.as_str().to_uppercase(),
        date.format("%Y%m%d"),
        sequence
    )
}
