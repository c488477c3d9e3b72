//! Error handling for the AgriMarket order service
//!
//! Maps domain failures onto a consistent JSON error envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::models::{CommissionError, LotError, PricingError, ScheduleError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Order/inventory business errors
    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("No pricing tier for quantity: {0}")]
    NoPricingTier(String),

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // External service errors
    #[error("Catalog service error: {0}")]
    CatalogError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<LotError> for AppError {
    fn from(err: LotError) -> Self {
        match err {
            LotError::InsufficientStock { .. } => AppError::InsufficientStock(err.to_string()),
            LotError::ReservationNotFound => AppError::ReservationNotFound,
            LotError::DuplicateReservation => AppError::Conflict(err.to_string()),
            LotError::NonPositiveQuantity => AppError::ValidationError(err.to_string()),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::NoPricingTier(err.to_string())
    }
}

impl From<CommissionError> for AppError {
    fn from(err: CommissionError) -> Self {
        AppError::InvalidStateTransition(err.to_string())
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::InvalidState { .. } => AppError::InvalidStateTransition(err.to_string()),
            ScheduleError::MissingCustomInterval => AppError::ValidationError(err.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn code_and_status(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation { .. } | AppError::ValidationError(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::ProductUnavailable(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PRODUCT_UNAVAILABLE")
            }
            AppError::InsufficientStock(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_STOCK")
            }
            AppError::NoPricingTier(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_PRICING_TIER_FOR_QUANTITY")
            }
            AppError::ReservationNotFound => (StatusCode::NOT_FOUND, "RESERVATION_NOT_FOUND"),
            AppError::InvalidStateTransition(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_STATE_TRANSITION")
            }
            AppError::CatalogError(_) => (StatusCode::BAD_GATEWAY, "CATALOG_ERROR"),
            AppError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
            }
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Internal(_) | AppError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.code_and_status();

        let message = match &self {
            // Do not leak database/internal details to clients
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalError(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        };
        let field = match &self {
            AppError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };

        tracing::error!("Error: {:?}", self);

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
