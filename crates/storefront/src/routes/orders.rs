//! Order route handlers: checkout, history, payment, cancellation, receipts.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::instrument;

use aurelia_core::OrderId;

use crate::db::Store;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderOutcome};
use crate::services::{CardDetails, CheckoutRequest, OrderService, receipt};
use crate::state::AppState;

/// Request header carrying the checkout idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(checkout).get(index))
        .route("/orders/{id}", get(show))
        .route("/orders/{id}/pay", post(pay))
        .route("/orders/{id}/cancel", post(cancel))
        .route("/orders/{id}/receipt", get(receipt_pdf))
}

fn service(state: &AppState) -> OrderService<'_, Store> {
    OrderService::new(state.store(), &state.config().store.shipping)
}

/// Place an order. 201 for a new order, 200 when the idempotency key was
/// already used and the original order is returned.
#[instrument(skip(state, user, headers, body), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let header_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|v| {
            v.to_str()
                .map(str::to_owned)
                .map_err(|_| AppError::BadRequest("Idempotency-Key must be ASCII".to_string()))
        })
        .transpose()?;

    let outcome = service(&state).checkout(&user, body, header_key).await?;
    let status = match &outcome {
        OrderOutcome::Created(order) => {
            add_breadcrumb(
                "checkout",
                "Order placed",
                &[("order_id", order.id.to_string()), ("total", order.total.to_string())],
            );
            StatusCode::CREATED
        }
        OrderOutcome::Existing(_) => StatusCode::OK,
    };
    Ok((status, Json(outcome.into_order())))
}

/// The caller's orders, newest first.
pub async fn index(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<Vec<Order>>> {
    Ok(Json(service(&state).list_for(&user).await?))
}

/// One order, for its owner or an admin.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(service(&state).get_for(&user, id).await?))
}

/// Pay for an order with the simulated processor.
#[instrument(skip(state, user, card), fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(card): Json<CardDetails>,
) -> Result<Json<Order>> {
    let order = service(&state).pay(&user, id, &card).await?;
    add_breadcrumb("payment", "Payment approved", &[("order_id", id.to_string())]);
    Ok(Json(order))
}

/// Cancel a pending, unpaid order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(service(&state).cancel(&user, id).await?))
}

/// PDF receipt for an order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn receipt_pdf(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let order = service(&state).get_for(&user, id).await?;
    let settings = &state.config().store;
    let pdf = receipt::render(&order, &settings.name, settings.currency);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"receipt-{}.pdf\"", order.number()),
            ),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        pdf,
    )
        .into_response())
}
