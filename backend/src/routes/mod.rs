//! Route definitions for the Tea Factory Management Platform

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // SMS gateway delivery reports (public - HMAC verified)
        .route("/webhook/notify", post(handlers::handle_notify_webhook))
        // Protected routes - product catalogue
        .nest("/products", product_routes())
        // Protected routes - stock ledger
        .nest("/inventory", inventory_routes())
        // Protected routes - alerts
        .nest("/alerts", alert_routes())
        // Protected routes - supplier payments
        .nest("/payments", payment_routes())
        // Protected routes - event stream
        .nest("/events", event_routes())
}

/// Authentication routes (public, except profile)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route(
            "/me",
            get(handlers::me).route_layer(middleware::from_fn(auth_middleware)),
        )
}

/// Product catalogue routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock ledger routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::record_transaction),
        )
        .route(
            "/products/:product_id/transactions",
            get(handlers::get_product_transactions),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Alert routes (protected)
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_alerts))
        .route("/sweep", post(handlers::run_sweep))
        .route("/read-all", post(handlers::mark_all_read))
        .route("/:alert_id/read", post(handlers::mark_read))
        .route("/:alert_id", delete(handlers::delete_alert))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Supplier payment routes (protected)
fn payment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections",
            get(handlers::list_collections).post(handlers::create_collection),
        )
        .route("/collections/:transaction_id", get(handlers::get_collection))
        .route(
            "/collections/:transaction_id/qr",
            get(handlers::generate_qr),
        )
        .route("/confirm", post(handlers::confirm_payment))
        .route("/report", get(handlers::reconciliation_report))
        .route("/report/csv", get(handlers::reconciliation_report_csv))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Event stream routes (protected)
fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/stream", get(handlers::event_stream))
        .route_layer(middleware::from_fn(auth_middleware))
}
