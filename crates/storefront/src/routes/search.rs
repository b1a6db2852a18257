//! Search route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::CatalogStore;
use crate::error::Result;
use crate::routes::products::empty_string_as_none;
use crate::search::{self, DEFAULT_LIMIT, SearchHit};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search_products))
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

/// Rank active products against the query.
#[instrument(skip(state), fields(q = %query.q))]
pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let q = query.q.trim();
    let results = if q.is_empty() {
        Vec::new()
    } else {
        let products = state.store().all_active_products().await?;
        search::search(products, q, query.limit.unwrap_or(DEFAULT_LIMIT))
    };

    tracing::debug!(hits = results.len(), "Search complete");
    Ok(Json(SearchResponse {
        query: q.to_string(),
        results,
    }))
}
