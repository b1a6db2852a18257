//! Admin dashboard report types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use aurelia_core::{OrderId, OrderStatus, PaymentStatus, ProductId};

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_orders: i64,
    pub pending_orders: i64,
    /// Sum of totals of paid orders.
    pub total_revenue: Decimal,
    pub total_customers: i64,
    pub active_products: i64,
    pub low_stock: Vec<LowStockProduct>,
    pub recent_orders: Vec<OrderSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: i32,
}

/// One order row in admin listings.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub customer_name: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Paid revenue for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

/// Best-selling product over a window, counted from paid orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

/// Sales report for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub days: u32,
    pub total_revenue: Decimal,
    pub total_orders: i64,
    pub daily: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
}

/// Fill in missing days with zero rows so the series is contiguous.
#[must_use]
pub fn zero_fill(since: NaiveDate, until: NaiveDate, sparse: &[DailySales]) -> Vec<DailySales> {
    since
        .iter_days()
        .take_while(|d| *d <= until)
        .map(|date| {
            sparse
                .iter()
                .find(|s| s.date == date)
                .cloned()
                .unwrap_or(DailySales {
                    date,
                    orders: 0,
                    revenue: Decimal::ZERO,
                })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fill() {
        let since = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        let sparse = vec![DailySales {
            date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            orders: 2,
            revenue: Decimal::new(41_000, 2),
        }];

        let filled = zero_fill(since, until, &sparse);
        assert_eq!(filled.len(), 4);
        assert_eq!(filled[0].orders, 0);
        assert_eq!(filled[2].revenue, Decimal::new(41_000, 2));
    }
}
