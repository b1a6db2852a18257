//! Cart queries for `PostgreSQL`.

use rust_decimal::Decimal;

use aurelia_core::{ProductCategory, ProductId, UserId};

use super::{CartStore, PgStore, Result};
use crate::models::CartLine;

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: ProductId,
    slug: String,
    name: String,
    category: ProductCategory,
    image_url: Option<String>,
    price: Decimal,
    quantity: i32,
    stock_quantity: i32,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            product_id: row.product_id,
            slug: row.slug,
            name: row.name,
            category: row.category,
            image_url: row.image_url,
            unit_price: row.price,
            quantity: row.quantity,
            stock_quantity: row.stock_quantity,
            line_total: row.price * Decimal::from(row.quantity),
        }
    }
}

impl CartStore for PgStore {
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>> {
        let rows: Vec<CartLineRow> = sqlx::query_as(
            r"
            SELECT c.product_id, p.slug, p.name, p.category, p.image_url, p.price,
                   c.quantity, p.stock_quantity
            FROM aurelia.cart_item c
            JOIN aurelia.product p ON p.id = c.product_id
            WHERE c.user_id = $1 AND p.is_active
            ORDER BY c.created_at, c.id
            ",
        )
        .bind(user)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add_to_cart(&self, user: UserId, product: ProductId, quantity: i32) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO aurelia.cart_item (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = aurelia.cart_item.quantity + EXCLUDED.quantity
            ",
        )
        .bind(user)
        .bind(product)
        .bind(quantity)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<()> {
        if quantity <= 0 {
            self.remove_from_cart(user, product).await?;
            return Ok(());
        }

        sqlx::query(
            r"
            INSERT INTO aurelia.cart_item (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
            ",
        )
        .bind(user)
        .bind(product)
        .bind(quantity)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn remove_from_cart(&self, user: UserId, product: ProductId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM aurelia.cart_item WHERE user_id = $1 AND product_id = $2")
                .bind(user)
                .bind(product)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user: UserId) -> Result<()> {
        sqlx::query("DELETE FROM aurelia.cart_item WHERE user_id = $1")
            .bind(user)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
