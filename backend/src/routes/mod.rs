//! Route definitions for the Clinic Stock Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - item master
        .nest("/items", item_routes(state.clone()))
        // Protected routes - suppliers
        .nest("/suppliers", supplier_routes(state.clone()))
        // Protected routes - receipts
        .nest("/stock-in", stock_in_routes(state.clone()))
        // Protected routes - issues and the FEFO lot picker
        .nest("/stock-out", stock_out_routes(state.clone()))
        // Protected routes - balance ledger
        .nest("/stock-balance", stock_balance_routes(state.clone()))
        // Protected routes - reports
        .nest("/reports", report_routes(state.clone()))
        // Protected routes - dashboard
        .nest("/dashboard", dashboard_routes(state))
}

/// Item master routes (protected)
fn item_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/:item_id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock-in routes (protected)
fn stock_in_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_ins).post(handlers::create_stock_in))
        .route(
            "/:stock_in_id",
            get(handlers::get_stock_in)
                .put(handlers::update_stock_in)
                .delete(handlers::cancel_stock_in),
        )
        .route("/:stock_in_id/confirm", post(handlers::confirm_stock_in))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock-out routes (protected)
fn stock_out_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_outs).post(handlers::create_stock_out))
        .route("/lots", get(handlers::get_available_lots))
        .route(
            "/:stock_out_id",
            get(handlers::get_stock_out)
                .put(handlers::update_stock_out)
                .delete(handlers::cancel_stock_out),
        )
        .route("/:stock_out_id/approve", post(handlers::approve_stock_out))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Balance ledger routes (protected, recalculation is ADMIN only)
fn stock_balance_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_balances))
        .route("/recalculate", post(handlers::recalculate_balances))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Report routes (protected)
fn report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/movements", get(handlers::get_movement_report))
        .route("/balance", get(handlers::get_balance_report))
        .route("/low-stock", get(handlers::get_low_stock_report))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Dashboard routes (protected)
fn dashboard_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/stats", get(handlers::get_dashboard_stats))
        .route("/recent-transactions", get(handlers::get_recent_transactions))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
