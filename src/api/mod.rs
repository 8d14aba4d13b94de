//! API routes

pub mod cart;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod payouts;
pub mod points;
pub mod psp_webhook;

use axum::routing::{delete, get, patch, post};
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::error::AppError;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Authenticated surfaces (buyer + retailer; role enforced per handler)
    let authed = Router::new()
        .route("/api/cart", get(cart::list_cart).post(cart::add_line))
        .route("/api/cart/{product_id}", delete(cart::remove_line))
        .route("/api/checkout", post(checkout::create_orders))
        .route("/api/orders", get(orders::list_my_orders))
        .route("/api/points", get(points::get_points))
        .route("/api/retailer/orders", get(orders::list_retailer_orders))
        .route(
            "/api/retailer/orders/{id}/status",
            patch(orders::update_status),
        )
        .route("/api/retailer/balance", get(payouts::get_balance))
        .route(
            "/api/retailer/payouts",
            get(payouts::list_payouts).post(payouts::request_payout),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Processor webhook (signature-verified, raw body)
    let webhook = Router::new().route("/psp/webhook", post(psp_webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(webhook)
        .merge(authed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
