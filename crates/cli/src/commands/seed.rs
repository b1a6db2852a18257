//! Seed the product catalog from YAML.
//!
//! Products are upserted by slug, so seeding is safe to repeat: existing
//! products are updated in place and order history is untouched.

use std::path::Path;

use tracing::info;

use aurelia_storefront::db::seed::{builtin_catalog, parse_catalog, seed_catalog};

use super::connect;

/// Upsert the catalog from `file`, or the built-in demo catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or a write fails.
pub async fn catalog(file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    // Read and validate before connecting to the database
    let products = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog from file");
            let content = tokio::fs::read_to_string(path).await?;
            parse_catalog(&content)?
        }
        None => {
            info!("Loading built-in demo catalog");
            builtin_catalog()?
        }
    };
    info!(products = products.len(), "Catalog validated");

    let store = connect().await?;
    let written = seed_catalog(&store, products).await?;

    info!("Seeding complete! {written} products upserted");
    Ok(())
}
