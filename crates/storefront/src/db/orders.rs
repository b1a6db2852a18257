//! Order queries for `PostgreSQL`, including the checkout transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{debug, instrument};

use aurelia_core::{
    OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, ShippingPolicy, UserId,
};

use super::{OrderStore, PgStore, RepositoryError, Result};
use crate::models::order::totals_for;
use crate::models::{
    NewOrder, Order, OrderFilter, OrderItem, OrderOutcome, OrderSummary, Page, PaymentUpdate,
    ReservedLine, ShippingDetails,
};

const ORDER_COLUMNS: &str = "id, user_id, status, payment_status, payment_reference, subtotal, \
     shipping_fee, total, shipping_full_name, shipping_address1, shipping_address2, shipping_city, \
     shipping_postal_code, shipping_country, shipping_phone, shipping_email, idempotency_key, \
     created_at, updated_at, paid_at";

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_reference: Option<String>,
    subtotal: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
    shipping_full_name: String,
    shipping_address1: String,
    shipping_address2: Option<String>,
    shipping_city: String,
    shipping_postal_code: String,
    shipping_country: String,
    shipping_phone: String,
    shipping_email: String,
    idempotency_key: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            status: self.status,
            payment_status: self.payment_status,
            payment_reference: self.payment_reference,
            subtotal: self.subtotal,
            shipping_fee: self.shipping_fee,
            total: self.total,
            shipping: ShippingDetails {
                full_name: self.shipping_full_name,
                address_line1: self.shipping_address1,
                address_line2: self.shipping_address2,
                city: self.shipping_city,
                postal_code: self.shipping_postal_code,
                country: self.shipping_country,
                phone: self.shipping_phone,
                email: self.shipping_email,
            },
            idempotency_key: self.idempotency_key,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
            paid_at: self.paid_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            line_total: row.line_total,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    id: OrderId,
    customer_name: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    total: Decimal,
    created_at: DateTime<Utc>,
}

impl From<OrderSummaryRow> for OrderSummary {
    fn from(row: OrderSummaryRow) -> Self {
        Self {
            id: row.id,
            customer_name: row.customer_name,
            status: row.status,
            payment_status: row.payment_status,
            total: row.total,
            created_at: row.created_at,
        }
    }
}

/// Attach items to a batch of order rows.
async fn with_items(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
    let item_rows: Vec<OrderItemRow> = sqlx::query_as(
        r"
        SELECT id, order_id, product_id, product_name, unit_price, quantity, line_total
        FROM aurelia.order_item
        WHERE order_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = item_rows
            .iter()
            .filter(|i| i.order_id == row.id)
            .map(|i| OrderItem {
                id: i.id,
                product_id: i.product_id,
                product_name: i.product_name.clone(),
                unit_price: i.unit_price,
                quantity: i.quantity,
                line_total: i.line_total,
            })
            .collect();
        orders.push(row.into_order(items));
    }
    Ok(orders)
}

async fn load_order(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM aurelia.customer_order WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items: Vec<OrderItemRow> = sqlx::query_as(
        r"
        SELECT id, order_id, product_id, product_name, unit_price, quantity, line_total
        FROM aurelia.order_item
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(row.into_order(items.into_iter().map(Into::into).collect())))
}

async fn find_by_key(conn: &mut PgConnection, user: UserId, key: &str) -> Result<Option<Order>> {
    let id: Option<OrderId> = sqlx::query_scalar(
        "SELECT id FROM aurelia.customer_order WHERE user_id = $1 AND idempotency_key = $2",
    )
    .bind(user)
    .bind(key)
    .fetch_optional(&mut *conn)
    .await?;

    match id {
        Some(id) => load_order(conn, id).await,
        None => Ok(None),
    }
}

/// Decrement stock for one line, or explain why it cannot be.
async fn reserve_line(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: i32,
) -> Result<ReservedLine> {
    let reserved: Option<(String, Decimal)> = sqlx::query_as(
        r"
        UPDATE aurelia.product
        SET stock_quantity = stock_quantity - $2, updated_at = now()
        WHERE id = $1 AND is_active AND stock_quantity >= $2
        RETURNING name, price
        ",
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((product_name, unit_price)) = reserved {
        return Ok(ReservedLine {
            product_id,
            product_name,
            unit_price,
            quantity,
        });
    }

    let current: Option<(String, i32, bool)> = sqlx::query_as(
        "SELECT name, stock_quantity, is_active FROM aurelia.product WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Err(match current {
        Some((product, available, true)) => RepositoryError::InsufficientStock {
            product,
            available,
            requested: quantity,
        },
        _ => RepositoryError::MissingProduct(product_id),
    })
}

impl OrderStore for PgStore {
    #[instrument(skip(self, order, shipping), fields(user_id = %order.user_id, lines = order.lines.len()))]
    async fn create_order(&self, order: NewOrder, shipping: &ShippingPolicy) -> Result<OrderOutcome> {
        let mut tx = self.pool().begin().await?;

        if let Some(existing) = find_by_key(&mut tx, order.user_id, &order.idempotency_key).await? {
            debug!(order_id = %existing.id, "idempotency key already used");
            return Ok(OrderOutcome::Existing(existing));
        }

        let mut reserved = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            reserved.push(reserve_line(&mut tx, line.product_id, line.quantity).await?);
        }

        let totals = totals_for(&reserved, shipping);
        let details = &order.shipping;

        let inserted: std::result::Result<OrderId, sqlx::Error> = sqlx::query_scalar(
            r"
            INSERT INTO aurelia.customer_order
                (user_id, subtotal, shipping_fee, total,
                 shipping_full_name, shipping_address1, shipping_address2, shipping_city,
                 shipping_postal_code, shipping_country, shipping_phone, shipping_email,
                 idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            ",
        )
        .bind(order.user_id)
        .bind(totals.subtotal)
        .bind(totals.shipping_fee)
        .bind(totals.total)
        .bind(&details.full_name)
        .bind(&details.address_line1)
        .bind(&details.address_line2)
        .bind(&details.city)
        .bind(&details.postal_code)
        .bind(&details.country)
        .bind(&details.phone)
        .bind(&details.email)
        .bind(&order.idempotency_key)
        .fetch_one(&mut *tx)
        .await;

        let order_id = match inserted {
            Ok(id) => id,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // A concurrent request with the same key won the race.
                tx.rollback().await?;
                let mut conn = self.pool().acquire().await?;
                return find_by_key(&mut conn, order.user_id, &order.idempotency_key)
                    .await?
                    .map(OrderOutcome::Existing)
                    .ok_or(RepositoryError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        for line in &reserved {
            sqlx::query(
                r"
                INSERT INTO aurelia.order_item
                    (order_id, product_id, product_name, unit_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(line.line_total())
            .execute(&mut *tx)
            .await?;
        }

        let created = load_order(&mut tx, order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(OrderOutcome::Created(created))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool().acquire().await?;
        load_order(&mut conn, id).await
    }

    async fn find_order_by_idempotency_key(&self, user: UserId, key: &str) -> Result<Option<Order>> {
        let mut conn = self.pool().acquire().await?;
        find_by_key(&mut conn, user, key).await
    }

    async fn list_orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let mut conn = self.pool().acquire().await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM aurelia.customer_order WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user)
        .fetch_all(&mut *conn)
        .await?;

        with_items(&mut conn, rows).await
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<OrderSummary>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM aurelia.customer_order WHERE $1::aurelia.order_status IS NULL OR status = $1",
        )
        .bind(filter.status)
        .fetch_one(self.pool())
        .await?;

        let rows: Vec<OrderSummaryRow> = sqlx::query_as(
            r"
            SELECT o.id, u.name AS customer_name, o.status, o.payment_status, o.total, o.created_at
            FROM aurelia.customer_order o
            JOIN aurelia.app_user u ON u.id = o.user_id
            WHERE $1::aurelia.order_status IS NULL OR o.status = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(filter.status)
        .bind(filter.pagination.limit())
        .bind(filter.pagination.offset())
        .fetch_all(self.pool())
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or_default(),
            filter.pagination,
        ))
    }

    async fn record_payment(&self, id: OrderId, update: PaymentUpdate) -> Result<Order> {
        let mut conn = self.pool().acquire().await?;

        let updated: Option<OrderId> = match &update {
            PaymentUpdate::Approved { reference } => {
                sqlx::query_scalar(
                    r"
                    UPDATE aurelia.customer_order
                    SET payment_status = 'paid', payment_reference = $2, status = 'processing',
                        paid_at = now(), updated_at = now()
                    WHERE id = $1 AND status = 'pending' AND payment_status <> 'paid'
                    RETURNING id
                    ",
                )
                .bind(id)
                .bind(reference)
                .fetch_optional(&mut *conn)
                .await?
            }
            PaymentUpdate::Declined => {
                sqlx::query_scalar(
                    r"
                    UPDATE aurelia.customer_order
                    SET payment_status = 'failed', updated_at = now()
                    WHERE id = $1 AND status = 'pending' AND payment_status <> 'paid'
                    RETURNING id
                    ",
                )
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
            }
        };

        let order = load_order(&mut conn, id).await?.ok_or(RepositoryError::NotFound)?;
        if updated.is_none() {
            return Err(RepositoryError::Conflict(
                "order is not awaiting payment".to_owned(),
            ));
        }
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let mut tx = self.pool().begin().await?;
        let cancelling = to == OrderStatus::Cancelled;

        let updated: Option<OrderId> = sqlx::query_scalar(
            r"
            UPDATE aurelia.customer_order
            SET status = $3,
                payment_status = CASE
                    WHEN $4 AND payment_status = 'paid' THEN 'refunded'::aurelia.payment_status
                    ELSE payment_status
                END,
                updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING id
            ",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(cancelling)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            let exists = load_order(&mut tx, id).await?.is_some();
            return Err(if exists {
                RepositoryError::Conflict(format!("order is no longer {from}"))
            } else {
                RepositoryError::NotFound
            });
        }

        if cancelling {
            let restocked = sqlx::query(
                r"
                UPDATE aurelia.product p
                SET stock_quantity = p.stock_quantity + i.quantity, updated_at = now()
                FROM aurelia.order_item i
                WHERE i.order_id = $1 AND p.id = i.product_id
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
            debug!(order_id = %id, products = restocked.rows_affected(), "restocked cancelled order");
        }

        let order = load_order(&mut tx, id).await?.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(order)
    }
}
