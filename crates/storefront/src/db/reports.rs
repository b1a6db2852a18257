//! Admin dashboard aggregates for `PostgreSQL`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use aurelia_core::{OrderId, OrderStatus, PaymentStatus, ProductId};

use super::{PgStore, ReportStore, Result};
use crate::models::{DailySales, DashboardSummary, LowStockProduct, OrderSummary, TopProduct};

#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    total_orders: i64,
    pending_orders: i64,
    total_revenue: Decimal,
    total_customers: i64,
    active_products: i64,
}

type RecentRow = (OrderId, String, OrderStatus, PaymentStatus, Decimal, DateTime<Utc>);

impl ReportStore for PgStore {
    async fn summary(&self, low_stock_threshold: i32, recent: i64) -> Result<DashboardSummary> {
        let counts: CountsRow = sqlx::query_as(
            r"
            SELECT
                (SELECT COUNT(*) FROM aurelia.customer_order) AS total_orders,
                (SELECT COUNT(*) FROM aurelia.customer_order WHERE status = 'pending') AS pending_orders,
                (SELECT COALESCE(SUM(total), 0) FROM aurelia.customer_order
                    WHERE payment_status = 'paid') AS total_revenue,
                (SELECT COUNT(*) FROM aurelia.app_user WHERE role = 'customer') AS total_customers,
                (SELECT COUNT(*) FROM aurelia.product WHERE is_active) AS active_products
            ",
        )
        .fetch_one(self.pool())
        .await?;

        let low_stock: Vec<(ProductId, String, i32)> = sqlx::query_as(
            r"
            SELECT id, name, stock_quantity
            FROM aurelia.product
            WHERE is_active AND stock_quantity <= $1
            ORDER BY stock_quantity, name
            ",
        )
        .bind(low_stock_threshold)
        .fetch_all(self.pool())
        .await?;

        let recent_rows: Vec<RecentRow> = sqlx::query_as(
            r"
            SELECT o.id, u.name, o.status, o.payment_status, o.total, o.created_at
            FROM aurelia.customer_order o
            JOIN aurelia.app_user u ON u.id = o.user_id
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $1
            ",
        )
        .bind(recent)
        .fetch_all(self.pool())
        .await?;

        Ok(DashboardSummary {
            total_orders: counts.total_orders,
            pending_orders: counts.pending_orders,
            total_revenue: counts.total_revenue,
            total_customers: counts.total_customers,
            active_products: counts.active_products,
            low_stock: low_stock
                .into_iter()
                .map(|(id, name, stock_quantity)| LowStockProduct {
                    id,
                    name,
                    stock_quantity,
                })
                .collect(),
            recent_orders: recent_rows
                .into_iter()
                .map(
                    |(id, customer_name, status, payment_status, total, created_at)| OrderSummary {
                        id,
                        customer_name,
                        status,
                        payment_status,
                        total,
                        created_at,
                    },
                )
                .collect(),
        })
    }

    async fn daily_sales(&self, since: DateTime<Utc>) -> Result<Vec<DailySales>> {
        let rows: Vec<(NaiveDate, i64, Decimal)> = sqlx::query_as(
            r"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*), SUM(total)
            FROM aurelia.customer_order
            WHERE payment_status = 'paid' AND created_at >= $1
            GROUP BY day
            ORDER BY day
            ",
        )
        .bind(since)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(date, orders, revenue)| DailySales {
                date,
                orders,
                revenue,
            })
            .collect())
    }

    async fn top_products(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<TopProduct>> {
        let rows: Vec<(ProductId, String, i64, Decimal)> = sqlx::query_as(
            r"
            SELECT i.product_id, p.name, SUM(i.quantity)::BIGINT, SUM(i.line_total)
            FROM aurelia.order_item i
            JOIN aurelia.customer_order o ON o.id = i.order_id
            JOIN aurelia.product p ON p.id = i.product_id
            WHERE o.payment_status = 'paid' AND o.created_at >= $1
            GROUP BY i.product_id, p.name
            ORDER BY SUM(i.quantity) DESC, SUM(i.line_total) DESC, p.name
            LIMIT $2
            ",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, name, units_sold, revenue)| TopProduct {
                product_id,
                name,
                units_sold,
                revenue,
            })
            .collect())
    }
}
