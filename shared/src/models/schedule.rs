//! Recurring order schedules
//!
//! A schedule is an item template plus a cadence. The runner turns due
//! schedules into concrete orders; `next_run_at` only advances on success so
//! a failed run is retried on the next scan tick.

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{DeliveryAddress, OrderType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule is {status}, expected {expected}")]
    InvalidState {
        status: &'static str,
        expected: &'static str,
    },

    #[error("custom frequency requires an interval in days")]
    MissingCustomInterval,
}

/// How often a schedule fires
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            "custom" => Ok(Frequency::Custom),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Paused,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Active => "active",
            ScheduleStatus::Paused => "paused",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ScheduleStatus::Active),
            "paused" => Ok(ScheduleStatus::Paused),
            "cancelled" => Ok(ScheduleStatus::Cancelled),
            other => Err(format!("unknown schedule status: {other}")),
        }
    }
}

/// One line of the order template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateItem {
    pub product_id: Uuid,
    pub quantity: Decimal,
    /// The run fails when the current resolved price exceeds this cap
    pub max_unit_price: Option<Decimal>,
}

/// Outcome of the most recent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastRun {
    pub at: DateTime<Utc>,
    pub order_id: Option<Uuid>,
    pub success: bool,
    pub error: Option<String>,
}

/// A template plus cadence that generates concrete orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringOrderSchedule {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub order_type: OrderType,
    pub items: Vec<TemplateItem>,
    pub delivery_address: DeliveryAddress,
    pub frequency: Frequency,
    /// Interval in days; only meaningful for `Frequency::Custom`
    pub custom_interval_days: Option<i64>,
    pub next_run_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: ScheduleStatus,
    pub last_run: Option<LastRun>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringOrderSchedule {
    /// The next occurrence after `from` under this schedule's cadence.
    /// Monthly uses calendar arithmetic, not a fixed number of days.
    pub fn next_run_after(&self, from: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        match self.frequency {
            Frequency::Weekly => Ok(from + Duration::days(7)),
            Frequency::Biweekly => Ok(from + Duration::days(14)),
            Frequency::Monthly => Ok(from
                .checked_add_months(Months::new(1))
                .unwrap_or(from + Duration::days(30))),
            Frequency::Custom => {
                let days = self
                    .custom_interval_days
                    .ok_or(ScheduleError::MissingCustomInterval)?;
                Ok(from + Duration::days(days))
            }
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Active && self.next_run_at <= now
    }

    /// Record a successful run: remember the produced order and advance the
    /// cadence from the run time. Auto-cancels once the recomputed next run
    /// passes the configured end date.
    pub fn record_success(
        &mut self,
        now: DateTime<Utc>,
        order_id: Uuid,
    ) -> Result<(), ScheduleError> {
        self.last_run = Some(LastRun {
            at: now,
            order_id: Some(order_id),
            success: true,
            error: None,
        });
        self.next_run_at = self.next_run_after(now)?;
        if let Some(end_date) = self.end_date {
            if self.next_run_at > end_date {
                self.status = ScheduleStatus::Cancelled;
            }
        }
        self.updated_at = now;
        Ok(())
    }

    /// Record a failed run. `next_run_at` stays put so the next scan tick
    /// retries this schedule.
    pub fn record_failure(&mut self, now: DateTime<Utc>, error: String) {
        self.last_run = Some(LastRun {
            at: now,
            order_id: None,
            success: false,
            error: Some(error),
        });
        self.updated_at = now;
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if self.status != ScheduleStatus::Active {
            return Err(ScheduleError::InvalidState {
                status: self.status.as_str(),
                expected: "active",
            });
        }
        self.status = ScheduleStatus::Paused;
        self.updated_at = now;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if self.status != ScheduleStatus::Paused {
            return Err(ScheduleError::InvalidState {
                status: self.status.as_str(),
                expected: "paused",
            });
        }
        self.status = ScheduleStatus::Active;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if self.status == ScheduleStatus::Cancelled {
            return Err(ScheduleError::InvalidState {
                status: self.status.as_str(),
                expected: "active or paused",
            });
        }
        self.status = ScheduleStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}
