//! HTTP handlers for order assembly and lifecycle

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::order::CreateOrderInput;
use crate::AppState;
use shared::models::Order;

/// Assemble an order: prices resolved, stock reserved, commission derived,
/// all-or-nothing.
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<impl IntoResponse> {
    let created = state.order_service().create_order(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get an order
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let order = state.order_service().get_order(order_id).await?;
    Ok(Json(order))
}

/// List orders placed by a buyer
pub async fn list_buyer_orders(
    State(state): State<AppState>,
    Path(buyer_id): Path<Uuid>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.order_service().list_orders_for_buyer(buyer_id).await?;
    Ok(Json(orders))
}

/// List orders received by a seller
pub async fn list_seller_orders(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state
        .order_service()
        .list_orders_for_seller(seller_id)
        .await?;
    Ok(Json(orders))
}

/// Confirm a pending order, making its reservations permanent
pub async fn confirm_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let order = state.order_service().confirm_order(order_id).await?;
    Ok(Json(order))
}

/// Cancel a pending order, releasing its reservations
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let order = state.order_service().cancel_order(order_id).await?;
    Ok(Json(order))
}
