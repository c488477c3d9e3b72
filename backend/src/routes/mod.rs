//! Route definitions for the AgriMarket Order Core

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Inventory lots and reservations
        .nest("/lots", lot_routes())
        // Price agreements and price resolution
        .nest("/agreements", agreement_routes())
        .route("/pricing/resolve", post(handlers::resolve_price))
        // Order assembly and lifecycle
        .nest("/orders", order_routes())
        // Commission ledger
        .nest("/commissions", commission_routes())
        // Recurring order schedules
        .nest("/schedules", schedule_routes())
}

/// Inventory lot routes
fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::register_lot))
        .route("/:lot_id", get(handlers::get_lot))
        .route("/:lot_id/reservations", post(handlers::reserve))
        .route("/:lot_id/reservations/confirm", post(handlers::confirm_reservation))
        .route("/:lot_id/reservations/cancel", post(handlers::cancel_reservation))
        .route("/:lot_id/sweep", post(handlers::sweep_lot))
        .route("/products/:product_id", get(handlers::list_lots_for_product))
}

/// Price agreement routes
fn agreement_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_agreement))
        .route("/:agreement_id", get(handlers::get_agreement))
        .route("/:agreement_id/submit", post(handlers::submit_agreement))
        .route("/:agreement_id/approve", post(handlers::approve_agreement))
        .route("/:agreement_id/reject", post(handlers::reject_agreement))
        .route("/:agreement_id/cancel", post(handlers::cancel_agreement))
        .route("/party/:party_id", get(handlers::list_agreements))
}

/// Order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/confirm", post(handlers::confirm_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
        .route("/buyer/:buyer_id", get(handlers::list_buyer_orders))
        .route("/seller/:seller_id", get(handlers::list_seller_orders))
}

/// Commission routes
fn commission_routes() -> Router<AppState> {
    Router::new()
        .route("/:commission_id", get(handlers::get_commission))
        .route("/:commission_id/transition", post(handlers::transition_commission))
        .route("/:commission_id/adjustments", post(handlers::add_adjustment))
        .route("/orders/:order_id", get(handlers::get_commission_for_order))
        .route("/sellers/:seller_id", get(handlers::list_seller_commissions))
}

/// Recurring schedule routes
fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_schedule))
        .route("/run-due", post(handlers::run_due_schedules))
        .route("/:schedule_id", get(handlers::get_schedule))
        .route("/:schedule_id/pause", post(handlers::pause_schedule))
        .route("/:schedule_id/resume", post(handlers::resume_schedule))
        .route("/:schedule_id/cancel", post(handlers::cancel_schedule))
        .route("/buyer/:buyer_id", get(handlers::list_buyer_schedules))
}
