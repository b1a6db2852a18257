//! Catalog seeding from YAML.
//!
//! The built-in demo catalog lives in `data/catalog.yaml` and is compiled into
//! the binary. It seeds the in-memory store on startup; `aurelia-cli seed`
//! loads it (or a custom file) into `PostgreSQL`.

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::{CatalogStore, RepositoryError};
use crate::models::NewProduct;

/// The built-in demo catalog.
pub const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.yaml");

/// Errors from loading or applying a catalog file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid catalog YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid product '{name}': {message}")]
    InvalidProduct { name: String, message: String },

    #[error("duplicate slug in catalog: {0}")]
    DuplicateSlug(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<NewProduct>,
}

/// Parse and validate a catalog file.
///
/// # Errors
///
/// Returns `SeedError` if the YAML is malformed, a product fails validation,
/// or two products share a slug.
pub fn parse_catalog(yaml: &str) -> Result<Vec<NewProduct>, SeedError> {
    let file: CatalogFile = serde_yaml::from_str(yaml)?;
    let mut seen = std::collections::HashSet::new();

    file.products
        .into_iter()
        .map(|product| {
            let name = product.name.clone();
            let product = product
                .normalize()
                .map_err(|message| SeedError::InvalidProduct { name, message })?;
            if !seen.insert(product.slug()) {
                return Err(SeedError::DuplicateSlug(product.slug()));
            }
            Ok(product)
        })
        .collect()
}

/// The built-in demo catalog, parsed.
///
/// # Errors
///
/// Returns `SeedError` if the embedded catalog is invalid.
pub fn builtin_catalog() -> Result<Vec<NewProduct>, SeedError> {
    parse_catalog(BUILTIN_CATALOG)
}

/// Upsert every product by slug. Returns the number of products written.
///
/// # Errors
///
/// Returns `SeedError::Repository` on the first failed write.
pub async fn seed_catalog<S: CatalogStore>(
    store: &S,
    products: Vec<NewProduct>,
) -> Result<usize, SeedError> {
    let count = products.len();
    for product in products {
        let saved = store.upsert_product(product).await?;
        info!(slug = %saved.slug, stock = saved.stock_quantity, "Seeded product");
    }
    Ok(count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let products = builtin_catalog().unwrap();
        assert!(products.len() >= 20);
        assert!(
            products
                .iter()
                .any(|p| p.category == aurelia_core::ProductCategory::Rings)
        );
    }

    #[test]
    fn test_duplicate_slugs_rejected() {
        let yaml = r#"
products:
  - { name: Band, category: rings, material: Gold, price: "10.00" }
  - { name: band, category: rings, material: Silver, price: "12.00" }
"#;
        assert!(matches!(
            parse_catalog(yaml),
            Err(SeedError::DuplicateSlug(slug)) if slug == "band"
        ));
    }

    #[test]
    fn test_invalid_product_rejected() {
        let yaml = r#"
products:
  - { name: Band, category: rings, material: Gold, price: "0" }
"#;
        assert!(matches!(
            parse_catalog(yaml),
            Err(SeedError::InvalidProduct { .. })
        ));
    }
}
