//! Route definitions for the Inventory & POS server

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Largest accepted image upload
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (login and register public)
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - stock items and movements
        .nest("/stock", stock_routes(state.clone()))
        // Protected routes - stock history
        .nest("/history", history_routes(state.clone()))
        // Protected routes - sales and checkout
        .nest("/sales", sales_routes(state.clone()))
        .nest("/pos", pos_routes(state.clone()))
        // Protected routes - suppliers and brands
        .nest("/suppliers", supplier_routes(state.clone()))
        .nest("/brands", brand_routes(state.clone()))
        // Protected routes - dashboard
        .nest("/dashboard", dashboard_routes(state))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .merge(
            Router::new()
                .route("/logout", post(handlers::logout))
                .route("/me", get(handlers::me))
                .route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
}

/// Stock item routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock).post(handlers::create_stock_item))
        .route("/low-stock", get(handlers::get_low_stock))
        .route("/export", get(handlers::export_stock_csv))
        .route(
            "/:item_id",
            get(handlers::get_stock_item)
                .put(handlers::update_stock_item)
                .delete(handlers::delete_stock_item),
        )
        .route("/:item_id/receive", post(handlers::receive_stock))
        .route("/:item_id/issue", post(handlers::issue_stock))
        .route("/:item_id/reorder-level", put(handlers::set_reorder_level))
        .route("/:item_id/price", get(handlers::get_product_price))
        .route(
            "/:item_id/image",
            post(handlers::upload_stock_image)
                .delete(handlers::delete_stock_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock history routes (protected)
fn history_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_history))
        .route("/bulk-delete", post(handlers::bulk_delete_history))
        .route("/:entry_id", delete(handlers::delete_history_entry))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Sales routes (protected)
fn sales_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::record_sale))
        .route("/:sale_id", delete(handlers::delete_sale))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Checkout screen routes (protected)
fn pos_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::pos_overview))
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

/// Brand routes (protected)
fn brand_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_brands))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Dashboard routes (protected)
fn dashboard_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
