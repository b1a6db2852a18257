//! Cart route handlers.
//!
//! Carts belong to the logged-in user and are stored server-side, so they
//! follow the user across devices.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::Deserialize;
use tracing::instrument;

use aurelia_core::ProductId;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::services::CartService;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(show).delete(clear))
        .route("/cart/items", post(add))
        .route("/cart/items/{product_id}", patch(update).delete(remove))
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Set quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i32,
}

fn service(state: &AppState) -> CartService<'_, crate::db::Store> {
    CartService::new(state.store(), &state.config().store.shipping)
}

/// The caller's cart with totals.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<CartView>> {
    Ok(Json(service(&state).view(user.id).await?))
}

/// Add a product.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let cart = service(&state)
        .add(user.id, body.product_id, body.quantity)
        .await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", body.product_id.to_string()),
            ("quantity", body.quantity.to_string()),
        ],
    );
    Ok(Json(cart))
}

/// Set a line's quantity. Zero removes the line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(body): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    Ok(Json(
        service(&state)
            .set_quantity(user.id, product_id, body.quantity)
            .await?,
    ))
}

/// Remove a line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    Ok(Json(service(&state).remove(user.id, product_id).await?))
}

/// Empty the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<StatusCode> {
    service(&state).clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
