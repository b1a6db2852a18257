//! Storage for the storefront.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL` (schema `aurelia`), used whenever a database
//!   URL is configured.
//! - [`MemoryStore`] - in-process tables seeded with the demo catalog, used
//!   for local development and tests.
//!
//! Both implement the store traits below. [`Store`] wraps either one and is
//! what the rest of the application holds.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p aurelia-cli -- migrate
//! ```

mod carts;
mod memory;
mod orders;
mod products;
mod reports;
pub mod seed;
mod users;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use aurelia_core::{Email, OrderId, OrderStatus, ProductId, ShippingPolicy, UserId, UserRole};

use crate::models::{
    CartLine, DailySales, DashboardSummary, NewOrder, NewProduct, NewUser, Order, OrderFilter,
    OrderOutcome, OrderSummary, Page, PaymentUpdate, Product, ProductFilter, ProductUpdate,
    TopProduct, User, UserCredentials,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Not enough stock to fulfil an order line.
    #[error("insufficient stock for {product}: {available} available, {requested} requested")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    /// An ordered product does not exist or is no longer sold.
    #[error("product {0} is not available")]
    MissingProduct(ProductId),
}

/// Repository result alias.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Map a unique violation to `Conflict`, passing everything else through.
pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Catalog reads and admin catalog management.
pub trait CatalogStore: Send + Sync {
    /// One page of active products matching the filter.
    fn list_products(&self, filter: &ProductFilter)
    -> impl Future<Output = Result<Page<Product>>> + Send;

    /// Every active product, used as the search corpus.
    fn all_active_products(&self) -> impl Future<Output = Result<Vec<Product>>> + Send;

    /// Get a product by ID, including inactive ones.
    fn get_product(&self, id: ProductId) -> impl Future<Output = Result<Option<Product>>> + Send;

    fn get_product_by_slug(&self, slug: &str)
    -> impl Future<Output = Result<Option<Product>>> + Send;

    /// Create a product. A duplicate slug is a `Conflict`.
    fn create_product(&self, product: NewProduct) -> impl Future<Output = Result<Product>> + Send;

    /// Insert or update a product by slug. Used by seeding.
    fn upsert_product(&self, product: NewProduct) -> impl Future<Output = Result<Product>> + Send;

    fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> impl Future<Output = Result<Product>> + Send;

    /// Soft delete: the product is deactivated and removed from every cart.
    fn delete_product(&self, id: ProductId) -> impl Future<Output = Result<()>> + Send;

    /// Add `delta` (possibly negative) to the stock level. Stock never drops below zero.
    fn adjust_stock(&self, id: ProductId, delta: i32)
    -> impl Future<Output = Result<Product>> + Send;
}

/// Account storage.
pub trait UserStore: Send + Sync {
    /// Create a user. A duplicate email is a `Conflict`.
    fn create_user(&self, user: NewUser) -> impl Future<Output = Result<User>> + Send;

    fn get_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Look up a user and their password hash by email.
    fn get_user_with_password(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<UserCredentials>>> + Send;

    fn set_user_role(&self, email: &Email, role: UserRole)
    -> impl Future<Output = Result<User>> + Send;

    fn count_users(&self) -> impl Future<Output = Result<i64>> + Send;
}

/// Per-user cart storage.
pub trait CartStore: Send + Sync {
    /// Cart lines joined with their (active) products, oldest first.
    fn cart_lines(&self, user: UserId) -> impl Future<Output = Result<Vec<CartLine>>> + Send;

    /// Add `quantity` to the line for `product`, creating it if needed.
    fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Set the quantity of a line. Zero removes it.
    fn set_cart_quantity(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a line. Returns whether one existed.
    fn remove_from_cart(
        &self,
        user: UserId,
        product: ProductId,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn clear_cart(&self, user: UserId) -> impl Future<Output = Result<()>> + Send;
}

/// Order storage.
pub trait OrderStore: Send + Sync {
    /// Place an order atomically.
    ///
    /// A previously seen `(user, idempotency key)` returns the original order
    /// untouched. Otherwise every line's stock is decremented, and the order
    /// and its items are inserted, all in one transaction. Any failure leaves
    /// stock unchanged.
    fn create_order(
        &self,
        order: NewOrder,
        shipping: &ShippingPolicy,
    ) -> impl Future<Output = Result<OrderOutcome>> + Send;

    fn get_order(&self, id: OrderId) -> impl Future<Output = Result<Option<Order>>> + Send;

    /// The order a user placed under an idempotency key, if any.
    fn find_order_by_idempotency_key(
        &self,
        user: UserId,
        key: &str,
    ) -> impl Future<Output = Result<Option<Order>>> + Send;

    /// A user's orders, newest first.
    fn list_orders_for_user(&self, user: UserId)
    -> impl Future<Output = Result<Vec<Order>>> + Send;

    /// All orders for the admin listing, newest first.
    fn list_orders(&self, filter: &OrderFilter)
    -> impl Future<Output = Result<Page<OrderSummary>>> + Send;

    /// Persist a payment attempt. Fails with `Conflict` unless the order is
    /// pending and not already paid.
    fn record_payment(
        &self,
        id: OrderId,
        update: PaymentUpdate,
    ) -> impl Future<Output = Result<Order>> + Send;

    /// Move an order from `from` to `to`. Fails with `Conflict` if the order is
    /// no longer in `from`. Cancelling restocks every item and refunds a paid order.
    fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> impl Future<Output = Result<Order>> + Send;
}

/// Admin dashboard aggregates.
pub trait ReportStore: Send + Sync {
    fn summary(
        &self,
        low_stock_threshold: i32,
        recent: i64,
    ) -> impl Future<Output = Result<DashboardSummary>> + Send;

    /// Paid orders grouped by UTC day since `since`. Days without sales are omitted.
    fn daily_sales(&self, since: DateTime<Utc>)
    -> impl Future<Output = Result<Vec<DailySales>>> + Send;

    fn top_products(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<TopProduct>>> + Send;
}

/// `PostgreSQL` store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// The configured storage backend.
#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    /// Connect to `PostgreSQL`.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the connection cannot be established.
    pub async fn connect(database_url: &secrecy::SecretString) -> std::result::Result<Self, sqlx::Error> {
        let pool = create_pool(database_url).await?;
        Ok(Self::Postgres(PgStore::new(pool)))
    }

    /// An in-memory store seeded with the demo catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in catalog cannot be parsed.
    pub fn memory() -> Result<Self> {
        Ok(Self::Memory(MemoryStore::seeded()?))
    }

    /// The `PostgreSQL` pool, if this store has one.
    #[must_use]
    pub const fn pg_pool(&self) -> Option<&PgPool> {
        match self {
            Self::Postgres(pg) => Some(pg.pool()),
            Self::Memory(_) => None,
        }
    }

    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if `PostgreSQL` does not respond.
    pub async fn ping(&self) -> Result<()> {
        match self {
            Self::Postgres(pg) => {
                sqlx::query("SELECT 1").execute(pg.pool()).await?;
                Ok(())
            }
            Self::Memory(_) => Ok(()),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Store::Postgres($store) => $call.await,
            Store::Memory($store) => $call.await,
        }
    };
}

impl CatalogStore for Store {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>> {
        dispatch!(self, s => s.list_products(filter))
    }

    async fn all_active_products(&self) -> Result<Vec<Product>> {
        dispatch!(self, s => s.all_active_products())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        dispatch!(self, s => s.get_product(id))
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        dispatch!(self, s => s.get_product_by_slug(slug))
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        dispatch!(self, s => s.create_product(product))
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product> {
        dispatch!(self, s => s.upsert_product(product))
    }

    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        dispatch!(self, s => s.update_product(id, update))
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        dispatch!(self, s => s.delete_product(id))
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product> {
        dispatch!(self, s => s.adjust_stock(id, delta))
    }
}

impl UserStore for Store {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        dispatch!(self, s => s.create_user(user))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        dispatch!(self, s => s.get_user(id))
    }

    async fn get_user_with_password(&self, email: &Email) -> Result<Option<UserCredentials>> {
        dispatch!(self, s => s.get_user_with_password(email))
    }

    async fn set_user_role(&self, email: &Email, role: UserRole) -> Result<User> {
        dispatch!(self, s => s.set_user_role(email, role))
    }

    async fn count_users(&self) -> Result<i64> {
        dispatch!(self, s => s.count_users())
    }
}

impl CartStore for Store {
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>> {
        dispatch!(self, s => s.cart_lines(user))
    }

    async fn add_to_cart(&self, user: UserId, product: ProductId, quantity: i32) -> Result<()> {
        dispatch!(self, s => s.add_to_cart(user, product, quantity))
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<()> {
        dispatch!(self, s => s.set_cart_quantity(user, product, quantity))
    }

    async fn remove_from_cart(&self, user: UserId, product: ProductId) -> Result<bool> {
        dispatch!(self, s => s.remove_from_cart(user, product))
    }

    async fn clear_cart(&self, user: UserId) -> Result<()> {
        dispatch!(self, s => s.clear_cart(user))
    }
}

impl OrderStore for Store {
    async fn create_order(&self, order: NewOrder, shipping: &ShippingPolicy) -> Result<OrderOutcome> {
        dispatch!(self, s => s.create_order(order, shipping))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        dispatch!(self, s => s.get_order(id))
    }

    async fn find_order_by_idempotency_key(&self, user: UserId, key: &str) -> Result<Option<Order>> {
        dispatch!(self, s => s.find_order_by_idempotency_key(user, key))
    }

    async fn list_orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        dispatch!(self, s => s.list_orders_for_user(user))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<OrderSummary>> {
        dispatch!(self, s => s.list_orders(filter))
    }

    async fn record_payment(&self, id: OrderId, update: PaymentUpdate) -> Result<Order> {
        dispatch!(self, s => s.record_payment(id, update))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        dispatch!(self, s => s.update_order_status(id, from, to))
    }
}

impl ReportStore for Store {
    async fn summary(&self, low_stock_threshold: i32, recent: i64) -> Result<DashboardSummary> {
        dispatch!(self, s => s.summary(low_stock_threshold, recent))
    }

    async fn daily_sales(&self, since: DateTime<Utc>) -> Result<Vec<DailySales>> {
        dispatch!(self, s => s.daily_sales(since))
    }

    async fn top_products(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<TopProduct>> {
        dispatch!(self, s => s.top_products(since, limit))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
