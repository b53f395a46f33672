//! Route definitions for the Stock Ledger Platform

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Receipt intake
        .nest("/receipts", receipt_routes())
        // FIFO consumption
        .nest("/consumptions", consumption_routes())
        // Inter-warehouse transfers
        .nest("/transfers", transfer_routes())
        // Fractionation
        .nest("/fractionations", fractionation_routes())
        // Manual adjustments
        .nest("/adjustments", adjustment_routes())
        // Stock queries
        .nest("/stock", stock_routes())
        // Lot store access
        .nest("/lots", lot_routes())
        // Movement log reads
        .nest("/movements", movement_routes())
        // Product catalog
        .nest("/products", product_routes())
        // Warehouses
        .nest("/warehouses", warehouse_routes())
        // Outbox inspection
        .nest("/outbox", outbox_routes())
}

fn receipt_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::register_receipt))
        .route("/:receipt_id/note", put(handlers::update_receipt_note))
}

fn consumption_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::consume_for_sale))
        .route("/pending", get(handlers::list_pending))
        .route("/replay/:product_id", post(handlers::replay_pending))
}

fn transfer_routes() -> Router<AppState> {
    Router::new().route("/", post(handlers::transfer))
}

fn fractionation_routes() -> Router<AppState> {
    Router::new().route("/", post(handlers::fractionate))
}

fn adjustment_routes() -> Router<AppState> {
    Router::new().route("/", post(handlers::record_adjustment))
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/snapshot/:day", get(handlers::get_initial_snapshot))
        .route("/:product_id", get(handlers::get_stock))
}

fn lot_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lots))
        .route("/:lot_id", get(handlers::get_lot))
        .route("/:lot_id/blocked", put(handlers::set_lot_blocked))
}

fn movement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_movements_by_reference))
        .route("/:movement_id", get(handlers::get_movement))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", put(handlers::upsert_product))
        .route("/:product_id", get(handlers::get_product))
}

fn warehouse_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_warehouses).post(handlers::create_warehouse),
    )
}

fn outbox_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_outbox_events))
        .route("/:event_id", get(handlers::get_outbox_event))
}
