//! HTTP handlers for the commission ledger

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::commission::AddAdjustmentInput;
use crate::AppState;
use shared::models::{Commission, CommissionStatus};

/// Body for advancing the settlement state
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: CommissionStatus,
}

/// Get a commission record
pub async fn get_commission(
    State(state): State<AppState>,
    Path(commission_id): Path<Uuid>,
) -> AppResult<Json<Commission>> {
    let commission = state.commission_service().get(commission_id).await?;
    Ok(Json(commission))
}

/// Get the commission derived from an order
pub async fn get_commission_for_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Commission>> {
    let commission = state.commission_service().get_by_order(order_id).await?;
    Ok(Json(commission))
}

/// List a seller's commissions
pub async fn list_seller_commissions(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> AppResult<Json<Vec<Commission>>> {
    let commissions = state.commission_service().list_for_seller(seller_id).await?;
    Ok(Json(commissions))
}

/// Advance the settlement state
pub async fn transition_commission(
    State(state): State<AppState>,
    Path(commission_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> AppResult<Json<Commission>> {
    let commission = state
        .commission_service()
        .transition(commission_id, request.status)
        .await?;
    Ok(Json(commission))
}

/// Append an adjustment, recomputing the payout
pub async fn add_adjustment(
    State(state): State<AppState>,
    Path(commission_id): Path<Uuid>,
    Json(input): Json<AddAdjustmentInput>,
) -> AppResult<Json<Commission>> {
    let commission = state
        .commission_service()
        .add_adjustment(commission_id, input)
        .await?;
    Ok(Json(commission))
}
