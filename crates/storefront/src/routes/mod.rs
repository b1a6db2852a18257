//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness
//! GET    /health/ready                   - Store reachable
//!
//! # Auth (strict rate limit)
//! POST   /api/auth/register              - Create account and log in
//! POST   /api/auth/login                 - Log in
//! POST   /api/auth/logout                - Log out
//! GET    /api/auth/me                    - Current user
//!
//! # Catalog
//! GET    /api/products                   - Filtered, sorted, paginated listing
//! GET    /api/products/{id_or_slug}      - Product detail
//! GET    /api/search                     - Multilingual search
//!
//! # Cart (requires auth)
//! GET    /api/cart                       - Cart with totals
//! DELETE /api/cart                       - Empty cart
//! POST   /api/cart/items                 - Add item
//! PATCH  /api/cart/items/{product_id}    - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}    - Remove item
//!
//! # Orders (requires auth)
//! POST   /api/orders                     - Checkout (idempotent)
//! GET    /api/orders                     - Order history
//! GET    /api/orders/{id}                - Order detail
//! POST   /api/orders/{id}/pay            - Simulated payment
//! POST   /api/orders/{id}/cancel         - Cancel pending order
//! GET    /api/orders/{id}/receipt        - PDF receipt
//!
//! # Admin (requires admin role)
//! GET    /api/admin/summary              - Dashboard summary
//! GET    /api/admin/sales                - Sales series
//! GET    /api/admin/orders               - All orders
//! PATCH  /api/admin/orders/{id}/status   - Change order status
//! POST   /api/admin/products             - Create product
//! PUT    /api/admin/products/{id}        - Update product
//! DELETE /api/admin/products/{id}        - Deactivate product
//! POST   /api/admin/products/{id}/stock  - Adjust stock
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;
pub mod search;

use std::time::Duration;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, security_headers_middleware,
    with_sessions,
};
use crate::state::AppState;

/// All `/api` routes. Rate limits apply when enabled in configuration.
pub fn api_routes(rate_limit: bool) -> Router<AppState> {
    let mut auth = auth::router();
    let mut rest = Router::new()
        .merge(products::router())
        .merge(search::router())
        .merge(cart::router())
        .merge(orders::router())
        .nest("/admin", admin::router());

    if rate_limit {
        auth = auth.layer(auth_rate_limiter());
        rest = rest.layer(api_rate_limiter());
    }

    Router::new().nest("/auth", auth).merge(rest)
}

/// Build the complete application with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let app = Router::new()
        .merge(health::router())
        .nest("/api", api_routes(state.config().rate_limit))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), security_headers_middleware))
        .with_state(state.clone());

    with_sessions(app, state.store(), state.config())
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

async fn not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}
