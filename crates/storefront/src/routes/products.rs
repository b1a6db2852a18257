//! Product catalog route handlers.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::instrument;

use aurelia_core::{ProductCategory, ProductId};

use crate::db::CatalogStore;
use crate::error::{AppError, Result};
use crate::models::{Page, Pagination, Product, ProductFilter, ProductSort};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index))
        .route("/products/{id_or_slug}", get(show))
}

/// Deserialize empty strings as `None`, parsing anything else with `FromStr`.
pub(crate) fn empty_string_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub material: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub max_price: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub in_stock: Option<bool>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub featured: Option<bool>,
    #[serde(default)]
    pub sort: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub per_page: Option<u32>,
}

impl ProductQuery {
    fn into_filter(self) -> Result<ProductFilter> {
        let category = self
            .category
            .map(|c| ProductCategory::from_str(&c))
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(AppError::BadRequest(
                "min_price must not exceed max_price".to_string(),
            ));
        }

        Ok(ProductFilter {
            category,
            material: self.material,
            min_price: self.min_price,
            max_price: self.max_price,
            in_stock_only: self.in_stock.unwrap_or(false),
            featured: self.featured,
            sort: ProductSort::parse(&self.sort),
            pagination: Pagination::new(self.page, self.per_page),
        })
    }
}

/// List active products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let filter = query.into_filter()?;
    Ok(Json(state.store().list_products(&filter).await?))
}

/// Product detail by numeric ID or slug. Inactive products are hidden.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<Product>> {
    let product = match id_or_slug.parse::<ProductId>() {
        Ok(id) => state.store().get_product(id).await?,
        Err(_) => state.store().get_product_by_slug(&id_or_slug).await?,
    };

    product
        .filter(|p| p.is_active)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}
