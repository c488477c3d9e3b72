//! Inventory lot aggregate with embedded reservations
//!
//! A lot is a discrete batch of one product at one storage location. All
//! reservation state lives inside the lot and is only mutated through the
//! lot's own operations, which keeps the reserved-quantity invariant local:
//! `reserved_quantity == sum of Active + Confirmed reservation quantities`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How long an unconfirmed reservation holds stock
pub const DEFAULT_RESERVATION_TTL_MINUTES: i64 = 30;

/// Errors raised by lot operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LotError {
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },

    #[error("no active reservation matches")]
    ReservationNotFound,

    #[error("an active or confirmed reservation already exists for this order")]
    DuplicateReservation,

    #[error("quantity must be positive")]
    NonPositiveQuantity,
}

/// Quality grade assigned at intake
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    GradeA,
    GradeB,
    GradeC,
    #[default]
    Ungraded,
}

impl QualityGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityGrade::GradeA => "grade_a",
            QualityGrade::GradeB => "grade_b",
            QualityGrade::GradeC => "grade_c",
            QualityGrade::Ungraded => "ungraded",
        }
    }
}

impl std::str::FromStr for QualityGrade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grade_a" => Ok(QualityGrade::GradeA),
            "grade_b" => Ok(QualityGrade::GradeB),
            "grade_c" => Ok(QualityGrade::GradeC),
            "ungraded" => Ok(QualityGrade::Ungraded),
            other => Err(format!("unknown quality grade: {other}")),
        }
    }
}

/// Lifecycle of a reservation against a lot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    Confirmed,
    Expired,
    Cancelled,
}

impl ReservationStatus {
    /// Statuses that count toward `reserved_quantity`
    pub fn holds_stock(&self) -> bool {
        matches!(self, ReservationStatus::Active | ReservationStatus::Confirmed)
    }
}

/// A claim against a lot's available quantity, tied to an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    /// None until the order row exists; attached retroactively
    pub order_id: Option<Uuid>,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl Reservation {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active && self.expires_at <= now
    }
}

/// A batch of physical stock of one product at one location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLot {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub total_quantity: Decimal,
    pub reserved_quantity: Decimal,
    pub harvest_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub quality_grade: QualityGrade,
    pub reservations: Vec<Reservation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryLot {
    /// Create a lot at intake (harvest or restock)
    pub fn new(
        product_id: Uuid,
        location_id: Uuid,
        total_quantity: Decimal,
        harvest_date: NaiveDate,
        expiry_date: Option<NaiveDate>,
        quality_grade: QualityGrade,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            location_id,
            total_quantity,
            reserved_quantity: Decimal::ZERO,
            harvest_date,
            expiry_date,
            quality_grade,
            reservations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Quantity not held by any active or confirmed reservation
    pub fn available(&self) -> Decimal {
        self.total_quantity - self.reserved_quantity
    }

    /// Expire overdue active reservations, releasing their quantity.
    ///
    /// Runs lazily at the top of every mutating operation, and is also driven
    /// by the periodic global sweep. Returns the ids that expired.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<Uuid> {
        let mut expired = Vec::new();
        for reservation in &mut self.reservations {
            if reservation.is_expired(now) {
                reservation.status = ReservationStatus::Expired;
                self.reserved_quantity -= reservation.quantity;
                expired.push(reservation.id);
            }
        }
        if !expired.is_empty() {
            self.updated_at = now;
        }
        expired
    }

    /// Claim `quantity` units for `order_id` (which may not exist yet).
    ///
    /// The claim expires `ttl` after `now` unless confirmed first.
    pub fn reserve(
        &mut self,
        order_id: Option<Uuid>,
        quantity: Decimal,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Uuid, LotError> {
        self.sweep_expired(now);

        if quantity <= Decimal::ZERO {
            return Err(LotError::NonPositiveQuantity);
        }
        if let Some(order_id) = order_id {
            if self.holding_reservation(order_id).is_some() {
                return Err(LotError::DuplicateReservation);
            }
        }
        let available = self.available();
        if quantity > available {
            return Err(LotError::InsufficientStock {
                requested: quantity,
                available,
            });
        }

        let reservation = Reservation {
            id: Uuid::new_v4(),
            order_id,
            quantity,
            created_at: now,
            expires_at: now + ttl,
            status: ReservationStatus::Active,
        };
        let id = reservation.id;
        self.reserved_quantity += quantity;
        self.reservations.push(reservation);
        self.updated_at = now;
        Ok(id)
    }

    /// Attach a freshly persisted order to a reservation made before the
    /// order row existed.
    pub fn attach_order(&mut self, reservation_id: Uuid, order_id: Uuid) -> Result<(), LotError> {
        if self.holding_reservation(order_id).is_some() {
            return Err(LotError::DuplicateReservation);
        }
        let reservation = self
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id && r.status == ReservationStatus::Active)
            .ok_or(LotError::ReservationNotFound)?;
        reservation.order_id = Some(order_id);
        Ok(())
    }

    /// Finalize the claim for an order. Confirmed reservations never expire.
    pub fn confirm_reservation(
        &mut self,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Uuid, LotError> {
        self.sweep_expired(now);

        let reservation = self
            .reservations
            .iter_mut()
            .find(|r| r.order_id == Some(order_id) && r.status == ReservationStatus::Active)
            .ok_or(LotError::ReservationNotFound)?;
        reservation.status = ReservationStatus::Confirmed;
        self.updated_at = now;
        Ok(reservation.id)
    }

    /// Release the claim for an order. Idempotent: a second call for the same
    /// order finds no active reservation and reports `false` without touching
    /// `reserved_quantity`.
    pub fn cancel_reservation(&mut self, order_id: Uuid, now: DateTime<Utc>) -> bool {
        self.sweep_expired(now);

        match self
            .reservations
            .iter_mut()
            .find(|r| r.order_id == Some(order_id) && r.status == ReservationStatus::Active)
        {
            Some(reservation) => {
                reservation.status = ReservationStatus::Cancelled;
                self.reserved_quantity -= reservation.quantity;
                self.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Release a claim by reservation id, used when rolling back a batch
    /// before any order was attached.
    pub fn cancel_reservation_by_id(&mut self, reservation_id: Uuid, now: DateTime<Utc>) -> bool {
        match self
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id && r.status == ReservationStatus::Active)
        {
            Some(reservation) => {
                reservation.status = ReservationStatus::Cancelled;
                self.reserved_quantity -= reservation.quantity;
                self.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Whether any active reservation is past its expiry at `now`
    pub fn has_expired_reservation(&self, now: DateTime<Utc>) -> bool {
        self.reservations.iter().any(|r| r.is_expired(now))
    }

    /// The reservation currently holding stock for `order_id`, if any
    pub fn holding_reservation(&self, order_id: Uuid) -> Option<&Reservation> {
        self.reservations
            .iter()
            .find(|r| r.order_id == Some(order_id) && r.status.holds_stock())
    }

    /// Sum of quantities currently holding stock; must equal
    /// `reserved_quantity` at all times
    pub fn holding_sum(&self) -> Decimal {
        self.reservations
            .iter()
            .filter(|r| r.status.holds_stock())
            .map(|r| r.quantity)
            .sum()
    }
}
