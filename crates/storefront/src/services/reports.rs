//! Admin dashboard reports.

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use crate::db::{ReportStore, RepositoryError};
use crate::models::report::zero_fill;
use crate::models::{DashboardSummary, SalesReport};

pub const DEFAULT_SALES_DAYS: u32 = 30;
pub const MAX_SALES_DAYS: u32 = 365;

const RECENT_ORDERS: i64 = 10;
const TOP_PRODUCTS: i64 = 5;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("days must be between 1 and {MAX_SALES_DAYS}")]
    InvalidRange,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct ReportService<'a, S> {
    store: &'a S,
    low_stock_threshold: i32,
}

impl<'a, S: ReportStore> ReportService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, low_stock_threshold: i32) -> Self {
        Self {
            store,
            low_stock_threshold,
        }
    }

    /// Headline numbers, low-stock products and the latest orders.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Repository` if the store fails.
    pub async fn summary(&self) -> Result<DashboardSummary, ReportError> {
        Ok(self
            .store
            .summary(self.low_stock_threshold, RECENT_ORDERS)
            .await?)
    }

    /// Paid sales for the last `days` days, today included.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidRange` when `days` is outside 1..=365.
    #[instrument(skip(self))]
    pub async fn sales(&self, days: u32) -> Result<SalesReport, ReportError> {
        self.sales_until(days, Utc::now().date_naive()).await
    }

    async fn sales_until(&self, days: u32, today: NaiveDate) -> Result<SalesReport, ReportError> {
        if !(1..=MAX_SALES_DAYS).contains(&days) {
            return Err(ReportError::InvalidRange);
        }
        let since = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or(ReportError::InvalidRange)?;
        let since_utc = since.and_time(chrono::NaiveTime::MIN).and_utc();

        let sparse = self.store.daily_sales(since_utc).await?;
        let top_products = self.store.top_products(since_utc, TOP_PRODUCTS).await?;
        let daily = zero_fill(since, today, &sparse);

        Ok(SalesReport {
            days,
            total_revenue: daily.iter().map(|d| d.revenue).sum::<Decimal>(),
            total_orders: daily.iter().map(|d| d.orders).sum(),
            daily,
            top_products,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn sales_series_is_contiguous() {
        let store = MemoryStore::seeded().unwrap();
        let reports = ReportService::new(&store, 3);
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        let report = reports.sales_until(7, today).await.unwrap();
        assert_eq!(report.daily.len(), 7);
        assert_eq!(report.daily.first().unwrap().date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(report.daily.last().unwrap().date, today);
        assert_eq!(report.total_orders, 0);
        assert_eq!(report.total_revenue, Decimal::ZERO);
    }

    #[tokio::test]
    async fn range_is_bounded() {
        let store = MemoryStore::new();
        let reports = ReportService::new(&store, 3);
        assert!(matches!(reports.sales(0).await, Err(ReportError::InvalidRange)));
        assert!(matches!(reports.sales(366).await, Err(ReportError::InvalidRange)));
        assert_eq!(reports.sales(1).await.unwrap().daily.len(), 1);
    }

    #[tokio::test]
    async fn summary_reports_low_stock() {
        let store = MemoryStore::seeded().unwrap();
        let summary = ReportService::new(&store, 3).summary().await.unwrap();
        assert!(summary.active_products > 0);
        assert!(summary.low_stock.iter().all(|p| p.stock_quantity <= 3));
        assert!(summary.recent_orders.is_empty());
    }
}
