//! Admin dashboard route handlers. Every handler requires the admin role.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use serde::Deserialize;
use tracing::{info, instrument};

use aurelia_core::{OrderId, OrderStatus, ProductId};

use crate::db::{CatalogStore, Store};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{
    DashboardSummary, NewProduct, Order, OrderFilter, OrderSummary, Page, Pagination, Product,
    ProductUpdate, SalesReport,
};
use crate::routes::products::empty_string_as_none;
use crate::services::reports::DEFAULT_SALES_DAYS;
use crate::services::{OrderService, ReportService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/sales", get(sales))
        .route("/orders", get(orders))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/products", post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/products/{id}/stock", post(adjust_stock))
}

fn reports(state: &AppState) -> ReportService<'_, Store> {
    ReportService::new(state.store(), state.config().store.low_stock_threshold)
}

/// Sales report query parameters.
#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub days: Option<u32>,
}

/// Admin order listing query parameters.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    pub delta: i32,
}

/// Dashboard headline numbers.
pub async fn summary(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardSummary>> {
    Ok(Json(reports(&state).summary().await?))
}

/// Daily paid sales for the last `days` days.
pub async fn sales(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<SalesQuery>,
) -> Result<Json<SalesReport>> {
    let days = query.days.unwrap_or(DEFAULT_SALES_DAYS);
    Ok(Json(reports(&state).sales(days).await?))
}

/// All orders, newest first, optionally by status.
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Page<OrderSummary>>> {
    let filter = OrderFilter {
        status: query.status,
        pagination: Pagination::new(query.page, query.per_page),
    };
    let page = OrderService::new(state.store(), &state.config().store.shipping)
        .list_all(&filter)
        .await?;
    Ok(Json(page))
}

/// Move an order through its lifecycle.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.store(), &state.config().store.shipping)
        .update_status(id, body.status)
        .await?;
    Ok(Json(order))
}

/// Create a product.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, name = %body.name))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = body.normalize().map_err(AppError::BadRequest)?;
    let product = state.store().create_product(product).await?;
    info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update product fields. Absent fields are left unchanged.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    body.validate().map_err(AppError::BadRequest)?;
    let product = state.store().update_product(id, &body).await?;
    info!(product_id = %id, "Product updated");
    Ok(Json(product))
}

/// Deactivate a product. It disappears from the catalog and from carts;
/// existing orders keep their snapshot.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.store().delete_product(id).await?;
    info!(product_id = %id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Add or remove stock. The level never drops below zero.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn adjust_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<StockAdjustment>,
) -> Result<Json<Product>> {
    if body.delta == 0 {
        return Err(AppError::BadRequest("delta must not be zero".to_string()));
    }
    let product = state.store().adjust_stock(id, body.delta).await?;
    info!(product_id = %id, delta = body.delta, stock = product.stock_quantity, "Stock adjusted");
    Ok(Json(product))
}
