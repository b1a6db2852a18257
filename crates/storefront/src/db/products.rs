//! Catalog queries for `PostgreSQL`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use aurelia_core::{ProductCategory, ProductId};

use super::{CatalogStore, PgStore, RepositoryError, Result, conflict_on_unique};
use crate::models::{NewProduct, Page, Product, ProductFilter, ProductUpdate};

pub(super) const PRODUCT_COLUMNS: &str = "id, slug, name, description, category, material, gemstone, \
     price, stock_quantity, image_url, is_featured, is_active, created_at, updated_at";

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    description: String,
    category: ProductCategory,
    material: String,
    gemstone: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    image_url: Option<String>,
    is_featured: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            category: row.category,
            material: row.material,
            gemstone: row.gemstone,
            price: row.price,
            stock_quantity: row.stock_quantity,
            image_url: row.image_url,
            is_featured: row.is_featured,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Append the filter's `WHERE` clause.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE is_active");
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(material) = &filter.material {
        qb.push(" AND material ILIKE ")
            .push_bind(format!("%{}%", escape_like(material)));
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
    if filter.in_stock_only {
        qb.push(" AND stock_quantity > 0");
    }
    if let Some(featured) = filter.featured {
        qb.push(" AND is_featured = ").push_bind(featured);
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

impl CatalogStore for PgStore {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM aurelia.product");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool()).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM aurelia.product"
        ));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(filter.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());

        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(self.pool()).await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or_default(),
            filter.pagination,
        ))
    }

    async fn all_active_products(&self) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM aurelia.product WHERE is_active ORDER BY id"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM aurelia.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM aurelia.product WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO aurelia.product
                (slug, name, description, category, material, gemstone, price,
                 stock_quantity, image_url, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.slug())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category)
        .bind(&product.material)
        .bind(&product.gemstone)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(&product.image_url)
        .bind(product.is_featured)
        .fetch_one(self.pool())
        .await
        .map_err(conflict_on_unique("slug already exists"))?;

        Ok(row.into())
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO aurelia.product
                (slug, name, description, category, material, gemstone, price,
                 stock_quantity, image_url, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                material = EXCLUDED.material,
                gemstone = EXCLUDED.gemstone,
                price = EXCLUDED.price,
                stock_quantity = EXCLUDED.stock_quantity,
                image_url = EXCLUDED.image_url,
                is_featured = EXCLUDED.is_featured,
                is_active = TRUE,
                updated_at = now()
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.slug())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category)
        .bind(&product.material)
        .bind(&product.gemstone)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(&product.image_url)
        .bind(product.is_featured)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        let mut tx = self.pool().begin().await?;

        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM aurelia.product WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut product: Product = row.ok_or(RepositoryError::NotFound)?.into();
        update.apply_to(&mut product);

        let row: ProductRow = sqlx::query_as(&format!(
            r"
            UPDATE aurelia.product SET
                name = $2, description = $3, category = $4, material = $5,
                gemstone = $6, price = $7, stock_quantity = $8, image_url = $9,
                is_featured = $10, is_active = $11, updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category)
        .bind(&product.material)
        .bind(&product.gemstone)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(&product.image_url)
        .bind(product.is_featured)
        .bind(product.is_active)
        .fetch_one(&mut *tx)
        .await?;

        if !product.is_active {
            sqlx::query("DELETE FROM aurelia.cart_item WHERE product_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE aurelia.product SET is_active = FALSE, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM aurelia.cart_item WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE aurelia.product
            SET stock_quantity = stock_quantity + $2, updated_at = now()
            WHERE id = $1 AND stock_quantity + $2 >= 0
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(delta)
        .fetch_optional(self.pool())
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        match self.get_product(id).await? {
            None => Err(RepositoryError::NotFound),
            Some(p) => Err(RepositoryError::Conflict(format!(
                "stock cannot go below zero (currently {})",
                p.stock_quantity
            ))),
        }
    }
}
