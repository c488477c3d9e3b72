//! HTTP handlers for inventory lots and reservations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::inventory::RegisterLotInput;
use crate::AppState;
use shared::models::InventoryLot;

/// Body for reserving stock against a specific lot
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub order_id: Option<Uuid>,
    pub quantity: Decimal,
}

/// Body for confirm/cancel, keyed by the owning order
#[derive(Debug, Deserialize)]
pub struct ReservationRef {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ReservationCreated {
    pub reservation_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CancelResult {
    pub released: bool,
}

#[derive(Debug, Serialize)]
pub struct SweepResult {
    pub expired: usize,
}

/// Register a lot of stock at intake
pub async fn register_lot(
    State(state): State<AppState>,
    Json(input): Json<RegisterLotInput>,
) -> AppResult<impl IntoResponse> {
    let lot = state.inventory_service().register_lot(input).await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

/// Get a lot with its reservations
pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<InventoryLot>> {
    let lot = state.inventory_service().get_lot(lot_id).await?;
    Ok(Json(lot))
}

/// List lots holding a product
pub async fn list_lots_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryLot>>> {
    let lots = state
        .inventory_service()
        .list_lots_for_product(product_id)
        .await?;
    Ok(Json(lots))
}

/// Reserve stock against a lot
pub async fn reserve(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(request): Json<ReserveRequest>,
) -> AppResult<impl IntoResponse> {
    let reservation_id = state
        .inventory_service()
        .reserve(lot_id, request.order_id, request.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(ReservationCreated { reservation_id })))
}

/// Confirm the reservation held for an order
pub async fn confirm_reservation(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(request): Json<ReservationRef>,
) -> AppResult<Json<ReservationCreated>> {
    let reservation_id = state
        .inventory_service()
        .confirm_reservation(lot_id, request.order_id)
        .await?;
    Ok(Json(ReservationCreated { reservation_id }))
}

/// Cancel the reservation held for an order (idempotent)
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
    Json(request): Json<ReservationRef>,
) -> AppResult<Json<CancelResult>> {
    let released = state
        .inventory_service()
        .cancel_reservation(lot_id, request.order_id)
        .await?;
    Ok(Json(CancelResult { released }))
}

/// Expire overdue reservations on one lot
pub async fn sweep_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<SweepResult>> {
    let expired = state.inventory_service().sweep_lot(lot_id).await?;
    Ok(Json(SweepResult {
        expired: expired.len(),
    }))
}
