//! HTTP handlers for price agreements and price resolution

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::pricing::{CreateAgreementInput, PriceResolution};
use crate::AppState;
use shared::models::PriceAgreement;
use shared::types::OrderType;

/// Body for resolving the unit price of a prospective order line
#[derive(Debug, Deserialize)]
pub struct ResolvePriceRequest {
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub order_type: OrderType,
}

/// Create a draft price agreement
pub async fn create_agreement(
    State(state): State<AppState>,
    Json(input): Json<CreateAgreementInput>,
) -> AppResult<impl IntoResponse> {
    let agreement = state.pricing_service().create_agreement(input).await?;
    Ok((StatusCode::CREATED, Json(agreement)))
}

/// Get an agreement
pub async fn get_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<Uuid>,
) -> AppResult<Json<PriceAgreement>> {
    let agreement = state.pricing_service().get_agreement(agreement_id).await?;
    Ok(Json(agreement))
}

/// List agreements where a party is seller or buyer
pub async fn list_agreements(
    State(state): State<AppState>,
    Path(party_id): Path<Uuid>,
) -> AppResult<Json<Vec<PriceAgreement>>> {
    let agreements = state.pricing_service().list_agreements_for(party_id).await?;
    Ok(Json(agreements))
}

/// Submit a draft for approval
pub async fn submit_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<Uuid>,
) -> AppResult<Json<PriceAgreement>> {
    let agreement = state.pricing_service().submit_agreement(agreement_id).await?;
    Ok(Json(agreement))
}

/// Approve an agreement, activating it
pub async fn approve_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<Uuid>,
) -> AppResult<Json<PriceAgreement>> {
    let agreement = state.pricing_service().approve_agreement(agreement_id).await?;
    Ok(Json(agreement))
}

/// Reject a pending agreement
pub async fn reject_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<Uuid>,
) -> AppResult<Json<PriceAgreement>> {
    let agreement = state.pricing_service().reject_agreement(agreement_id).await?;
    Ok(Json(agreement))
}

/// Cancel an agreement
pub async fn cancel_agreement(
    State(state): State<AppState>,
    Path(agreement_id): Path<Uuid>,
) -> AppResult<Json<PriceAgreement>> {
    let agreement = state.pricing_service().cancel_agreement(agreement_id).await?;
    Ok(Json(agreement))
}

/// Resolve the unit price for a prospective order line. The list price comes
/// from the catalog; an applicable agreement tier overrides it.
pub async fn resolve_price(
    State(state): State<AppState>,
    Json(request): Json<ResolvePriceRequest>,
) -> AppResult<Json<PriceResolution>> {
    let product = state.catalog.get_product(request.product_id).await?;
    let resolution = state
        .pricing_service()
        .resolve_price(
            request.seller_id,
            request.buyer_id,
            request.product_id,
            request.quantity,
            request.order_type,
            product.base_price,
        )
        .await?;
    Ok(Json(resolution))
}
