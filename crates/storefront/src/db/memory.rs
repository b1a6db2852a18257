//! In-memory store.
//!
//! Every table sits behind one mutex, so each operation (order placement
//! included) is a single critical section and observes a consistent snapshot.
//! Used when no database is configured, and by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use aurelia_core::{
    Email, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId,
    ShippingPolicy, UserId, UserRole,
};

use super::seed::builtin_catalog;
use super::{
    CartStore, CatalogStore, OrderStore, ReportStore, RepositoryError, Result, UserStore,
};
use crate::models::order::totals_for;
use crate::models::{
    CartLine, DailySales, DashboardSummary, LowStockProduct, NewOrder, NewProduct, NewUser, Order,
    OrderFilter, OrderItem, OrderOutcome, OrderSummary, Page, PaymentUpdate, Product,
    ProductFilter, ProductUpdate, ReservedLine, TopProduct, User, UserCredentials,
};

#[derive(Debug)]
struct CartRow {
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
}

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    users: BTreeMap<UserId, UserCredentials>,
    cart: Vec<CartRow>,
    orders: BTreeMap<OrderId, Order>,
    last_id: i32,
}

impl Tables {
    /// IDs are shared across tables; they only need to be unique per table.
    const fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        let slug = product.slug();
        if self.products.values().any(|p| p.slug == slug) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        let now = Utc::now();
        let created = Product {
            id: ProductId::new(self.next_id()),
            slug,
            name: product.name,
            description: product.description,
            category: product.category,
            material: product.material,
            gemstone: product.gemstone,
            price: product.price,
            stock_quantity: product.stock_quantity,
            image_url: product.image_url,
            is_featured: product.is_featured,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.products.insert(created.id, created.clone());
        Ok(created)
    }

    fn product_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        self.products.get_mut(&id).ok_or(RepositoryError::NotFound)
    }

    fn order_by_key(&self, user: UserId, key: &str) -> Option<&Order> {
        self.orders
            .values()
            .find(|o| o.user_id == user && o.idempotency_key == key)
    }

    fn customer_name(&self, user: UserId) -> String {
        self.users
            .get(&user)
            .map(|u| u.user.name.clone())
            .unwrap_or_default()
    }

    fn summarize(&self, order: &Order) -> OrderSummary {
        OrderSummary {
            id: order.id,
            customer_name: self.customer_name(order.user_id),
            status: order.status,
            payment_status: order.payment_status,
            total: order.total,
            created_at: order.created_at,
        }
    }

    fn paid_orders_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &Order> {
        self.orders
            .values()
            .filter(move |o| o.payment_status == PaymentStatus::Paid && o.created_at >= since)
    }
}

/// In-memory implementation of every store trait.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the built-in demo catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the embedded catalog is invalid.
    pub fn seeded() -> Result<Self> {
        let products =
            builtin_catalog().map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let store = Self::new();
        {
            let mut tables = store.tables.lock();
            for product in products {
                tables.insert_product(product)?;
            }
        }
        Ok(store)
    }
}

impl CatalogStore for MemoryStore {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>> {
        let tables = self.tables.lock();
        let mut matching: Vec<Product> = tables
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| filter.sort.compare(a, b));
        Ok(Page::from_sorted(matching, filter.pagination))
    }

    async fn all_active_products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.lock();
        Ok(tables
            .products
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.lock().products.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let tables = self.tables.lock();
        Ok(tables.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        self.tables.lock().insert_product(product)
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.lock();
        let slug = product.slug();
        if !tables.products.values().any(|p| p.slug == slug) {
            return tables.insert_product(product);
        }
        let existing = tables
            .products
            .values_mut()
            .find(|p| p.slug == slug)
            .ok_or(RepositoryError::NotFound)?;

        existing.name = product.name;
        existing.description = product.description;
        existing.category = product.category;
        existing.material = product.material;
        existing.gemstone = product.gemstone;
        existing.price = product.price;
        existing.stock_quantity = product.stock_quantity;
        existing.image_url = product.image_url;
        existing.is_featured = product.is_featured;
        existing.is_active = true;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        let mut tables = self.tables.lock();
        let product = tables.product_mut(id)?;
        update.apply_to(product);
        product.updated_at = Utc::now();
        let updated = product.clone();

        if !updated.is_active {
            tables.cart.retain(|row| row.product_id != id);
        }
        Ok(updated)
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tables = self.tables.lock();
        let product = tables.product_mut(id)?;
        product.is_active = false;
        product.updated_at = Utc::now();
        tables.cart.retain(|row| row.product_id != id);
        Ok(())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<Product> {
        let mut tables = self.tables.lock();
        let product = tables.product_mut(id)?;
        let next = product.stock_quantity.checked_add(delta).unwrap_or(-1);
        if next < 0 {
            return Err(RepositoryError::Conflict(format!(
                "stock cannot go below zero (currently {})",
                product.stock_quantity
            )));
        }
        product.stock_quantity = next;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }
}

impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock();
        if tables.users.values().any(|u| u.user.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let created = User {
            id: UserId::new(tables.next_id()),
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(
            created.id,
            UserCredentials {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.lock().users.get(&id).map(|u| u.user.clone()))
    }

    async fn get_user_with_password(&self, email: &Email) -> Result<Option<UserCredentials>> {
        let tables = self.tables.lock();
        Ok(tables
            .users
            .values()
            .find(|u| &u.user.email == email)
            .cloned())
    }

    async fn set_user_role(&self, email: &Email, role: UserRole) -> Result<User> {
        let mut tables = self.tables.lock();
        let stored = tables
            .users
            .values_mut()
            .find(|u| &u.user.email == email)
            .ok_or(RepositoryError::NotFound)?;
        stored.user.role = role;
        Ok(stored.user.clone())
    }

    async fn count_users(&self) -> Result<i64> {
        Ok(i64::try_from(self.tables.lock().users.len()).unwrap_or(i64::MAX))
    }
}

impl CartStore for MemoryStore {
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>> {
        let tables = self.tables.lock();
        Ok(tables
            .cart
            .iter()
            .filter(|row| row.user_id == user)
            .filter_map(|row| {
                let p = tables.products.get(&row.product_id)?;
                p.is_active.then(|| CartLine {
                    product_id: p.id,
                    slug: p.slug.clone(),
                    name: p.name.clone(),
                    category: p.category,
                    image_url: p.image_url.clone(),
                    unit_price: p.price,
                    quantity: row.quantity,
                    stock_quantity: p.stock_quantity,
                    line_total: p.price * Decimal::from(row.quantity),
                })
            })
            .collect())
    }

    async fn add_to_cart(&self, user: UserId, product: ProductId, quantity: i32) -> Result<()> {
        let mut tables = self.tables.lock();
        if !tables.products.contains_key(&product) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(row) = tables
            .cart
            .iter_mut()
            .find(|r| r.user_id == user && r.product_id == product)
        {
            row.quantity += quantity;
        } else {
            tables.cart.push(CartRow {
                user_id: user,
                product_id: product,
                quantity,
            });
        }
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

        let updated = {
            let mut tables = self.tables.lock();
            tables
                .cart
                .iter_mut()
                .find(|r| r.user_id == user && r.product_id == product)
                .map(|row| row.quantity = quantity)
                .is_some()
        };
        if updated {
            return Ok(());
        }
        self.add_to_cart(user, product, quantity).await
    }

    async fn remove_from_cart(&self, user: UserId, product: ProductId) -> Result<bool> {
        let mut tables = self.tables.lock();
        let before = tables.cart.len();
        tables
            .cart
            .retain(|r| !(r.user_id == user && r.product_id == product));
        Ok(tables.cart.len() < before)
    }

    async fn clear_cart(&self, user: UserId) -> Result<()> {
        self.tables.lock().cart.retain(|r| r.user_id != user);
        Ok(())
    }
}

impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder, shipping: &ShippingPolicy) -> Result<OrderOutcome> {
        let mut tables = self.tables.lock();

        if let Some(existing) = tables.order_by_key(order.user_id, &order.idempotency_key) {
            return Ok(OrderOutcome::Existing(existing.clone()));
        }

        // Check every line before touching stock so a failure changes nothing.
        let mut reserved = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = tables
                .products
                .get(&line.product_id)
                .filter(|p| p.is_active)
                .ok_or(RepositoryError::MissingProduct(line.product_id))?;
            if product.stock_quantity < line.quantity {
                return Err(RepositoryError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock_quantity,
                    requested: line.quantity,
                });
            }
            reserved.push(ReservedLine {
                product_id: product.id,
                product_name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
            });
        }

        let now = Utc::now();
        for line in &reserved {
            let product = tables.product_mut(line.product_id)?;
            product.stock_quantity -= line.quantity;
            product.updated_at = now;
        }

        let totals = totals_for(&reserved, shipping);
        let items = reserved
            .iter()
            .map(|line| OrderItem {
                id: OrderItemId::new(tables.next_id()),
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.line_total(),
            })
            .collect();

        let created = Order {
            id: OrderId::new(tables.next_id()),
            user_id: order.user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_reference: None,
            subtotal: totals.subtotal,
            shipping_fee: totals.shipping_fee,
            total: totals.total,
            shipping: order.shipping,
            idempotency_key: order.idempotency_key,
            items,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };
        tables.orders.insert(created.id, created.clone());

        Ok(OrderOutcome::Created(created))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.lock().orders.get(&id).cloned())
    }

    async fn find_order_by_idempotency_key(&self, user: UserId, key: &str) -> Result<Option<Order>> {
        Ok(self.tables.lock().order_by_key(user, key).cloned())
    }

    async fn list_orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.lock();
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<OrderSummary>> {
        let tables = self.tables.lock();
        let matching: Vec<OrderSummary> = tables
            .orders
            .values()
            .rev()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .map(|o| tables.summarize(o))
            .collect();
        Ok(Page::from_sorted(matching, filter.pagination))
    }

    async fn record_payment(&self, id: OrderId, update: PaymentUpdate) -> Result<Order> {
        let mut tables = self.tables.lock();
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if !order.is_payable() {
            return Err(RepositoryError::Conflict(
                "order is not awaiting payment".to_owned(),
            ));
        }

        let now = Utc::now();
        match update {
            PaymentUpdate::Approved { reference } => {
                order.payment_status = PaymentStatus::Paid;
                order.payment_reference = Some(reference);
                order.status = OrderStatus::Processing;
                order.paid_at = Some(now);
            }
            PaymentUpdate::Declined => order.payment_status = PaymentStatus::Failed,
        }
        order.updated_at = now;
        Ok(order.clone())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let mut tables = self.tables.lock();
        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.status != from {
            return Err(RepositoryError::Conflict(format!("order is no longer {from}")));
        }

        let now = Utc::now();
        order.status = to;
        order.updated_at = now;
        if to == OrderStatus::Cancelled && order.payment_status == PaymentStatus::Paid {
            order.payment_status = PaymentStatus::Refunded;
        }
        let updated = order.clone();

        if to == OrderStatus::Cancelled {
            for item in &updated.items {
                if let Some(product) = tables.products.get_mut(&item.product_id) {
                    product.stock_quantity += item.quantity;
                    product.updated_at = now;
                }
            }
        }
        Ok(updated)
    }
}

impl ReportStore for MemoryStore {
    async fn summary(&self, low_stock_threshold: i32, recent: i64) -> Result<DashboardSummary> {
        let tables = self.tables.lock();
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);

        let mut low_stock: Vec<LowStockProduct> = tables
            .products
            .values()
            .filter(|p| p.is_active && p.stock_quantity <= low_stock_threshold)
            .map(|p| LowStockProduct {
                id: p.id,
                name: p.name.clone(),
                stock_quantity: p.stock_quantity,
            })
            .collect();
        low_stock.sort_by(|a, b| {
            a.stock_quantity
                .cmp(&b.stock_quantity)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(DashboardSummary {
            total_orders: count(tables.orders.len()),
            pending_orders: count(
                tables
                    .orders
                    .values()
                    .filter(|o| o.status == OrderStatus::Pending)
                    .count(),
            ),
            total_revenue: tables
                .orders
                .values()
                .filter(|o| o.payment_status == PaymentStatus::Paid)
                .map(|o| o.total)
                .sum(),
            total_customers: count(
                tables
                    .users
                    .values()
                    .filter(|u| u.user.role == UserRole::Customer)
                    .count(),
            ),
            active_products: count(tables.products.values().filter(|p| p.is_active).count()),
            low_stock,
            recent_orders: tables
                .orders
                .values()
                .rev()
                .take(usize::try_from(recent).unwrap_or(0))
                .map(|o| tables.summarize(o))
                .collect(),
        })
    }

    async fn daily_sales(&self, since: DateTime<Utc>) -> Result<Vec<DailySales>> {
        let tables = self.tables.lock();
        let mut by_day: BTreeMap<chrono::NaiveDate, DailySales> = BTreeMap::new();
        for order in tables.paid_orders_since(since) {
            let date = order.created_at.date_naive();
            let day = by_day.entry(date).or_insert(DailySales {
                date,
                orders: 0,
                revenue: Decimal::ZERO,
            });
            day.orders += 1;
            day.revenue += order.total;
        }
        Ok(by_day.into_values().collect())
    }

    async fn top_products(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<TopProduct>> {
        let tables = self.tables.lock();
        let mut totals: HashMap<ProductId, TopProduct> = HashMap::new();
        for item in tables.paid_orders_since(since).flat_map(|o| &o.items) {
            let entry = totals.entry(item.product_id).or_insert_with(|| TopProduct {
                product_id: item.product_id,
                name: tables
                    .products
                    .get(&item.product_id)
                    .map_or_else(|| item.product_name.clone(), |p| p.name.clone()),
                units_sold: 0,
                revenue: Decimal::ZERO,
            });
            entry.units_sold += i64::from(item.quantity);
            entry.revenue += item.line_total;
        }

        let mut ranked: Vec<TopProduct> = totals.into_values().collect();
        ranked.sort_by(|a, b| {
            b.units_sold
                .cmp(&a.units_sold)
                .then_with(|| b.revenue.cmp(&a.revenue))
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(ranked)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::{OrderLineRequest, ShippingDetails};

    fn new_product(name: &str, price: i64, stock: i32) -> NewProduct {
        NewProduct {
            slug: None,
            name: name.to_owned(),
            description: String::new(),
            category: aurelia_core::ProductCategory::Rings,
            material: "18k Yellow Gold".to_owned(),
            gemstone: None,
            price: Decimal::new(price, 2),
            stock_quantity: stock,
            image_url: None,
            is_featured: false,
        }
    }

    async fn customer(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(NewUser {
                email: Email::parse(email).unwrap(),
                name: "Test Customer".to_owned(),
                password_hash: "hash".to_owned(),
                role: UserRole::Customer,
            })
            .await
            .unwrap()
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            full_name: "Test Customer".to_owned(),
            address_line1: "1 Main St".to_owned(),
            address_line2: None,
            city: "Springfield".to_owned(),
            postal_code: "12345".to_owned(),
            country: "US".to_owned(),
            phone: "5550100".to_owned(),
            email: "test@example.com".to_owned(),
        }
    }

    fn new_order(user: UserId, key: &str, lines: &[(ProductId, i32)]) -> NewOrder {
        NewOrder {
            user_id: user,
            idempotency_key: key.to_owned(),
            shipping: shipping(),
            lines: lines
                .iter()
                .map(|&(product_id, quantity)| OrderLineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn insufficient_stock_changes_nothing() {
        let store = MemoryStore::new();
        let plenty = store.create_product(new_product("Band", 10_000, 10)).await.unwrap();
        let scarce = store.create_product(new_product("Halo", 20_000, 1)).await.unwrap();
        let user = customer(&store, "a@example.com").await;

        let err = store
            .create_order(
                new_order(user.id, "k1", &[(plenty.id, 2), (scarce.id, 2)]),
                &ShippingPolicy::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RepositoryError::InsufficientStock { available: 1, requested: 2, .. }
        ));
        assert_eq!(store.get_product(plenty.id).await.unwrap().unwrap().stock_quantity, 10);
        assert_eq!(store.get_product(scarce.id).await.unwrap().unwrap().stock_quantity, 1);
        assert!(store.list_orders_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_returns_original() {
        let store = MemoryStore::new();
        let band = store.create_product(new_product("Band", 10_000, 5)).await.unwrap();
        let user = customer(&store, "a@example.com").await;
        let policy = ShippingPolicy::default();

        let first = store
            .create_order(new_order(user.id, "same", &[(band.id, 2)]), &policy)
            .await
            .unwrap();
        let second = store
            .create_order(new_order(user.id, "same", &[(band.id, 2)]), &policy)
            .await
            .unwrap();

        assert!(first.is_created());
        assert!(!second.is_created());
        assert_eq!(first.order().id, second.order().id);
        assert_eq!(store.get_product(band.id).await.unwrap().unwrap().stock_quantity, 3);
    }

    #[tokio::test]
    async fn idempotency_keys_are_scoped_per_user() {
        let store = MemoryStore::new();
        let band = store.create_product(new_product("Band", 10_000, 5)).await.unwrap();
        let alice = customer(&store, "alice@example.com").await;
        let bob = customer(&store, "bob@example.com").await;
        let policy = ShippingPolicy::default();

        let a = store
            .create_order(new_order(alice.id, "shared", &[(band.id, 1)]), &policy)
            .await
            .unwrap();
        let b = store
            .create_order(new_order(bob.id, "shared", &[(band.id, 1)]), &policy)
            .await
            .unwrap();

        assert!(a.is_created() && b.is_created());
        assert_ne!(a.order().id, b.order().id);
    }

    #[tokio::test]
    async fn inactive_product_cannot_be_ordered() {
        let store = MemoryStore::new();
        let band = store.create_product(new_product("Band", 10_000, 5)).await.unwrap();
        let user = customer(&store, "a@example.com").await;
        store.delete_product(band.id).await.unwrap();

        let err = store
            .create_order(new_order(user.id, "k", &[(band.id, 1)]), &ShippingPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::MissingProduct(id) if id == band.id));
    }

    #[tokio::test]
    async fn cancelling_restocks_and_refunds() {
        let store = MemoryStore::new();
        let band = store.create_product(new_product("Band", 10_000, 5)).await.unwrap();
        let user = customer(&store, "a@example.com").await;

        let order = store
            .create_order(new_order(user.id, "k", &[(band.id, 3)]), &ShippingPolicy::default())
            .await
            .unwrap()
            .into_order();
        store
            .record_payment(order.id, PaymentUpdate::Approved { reference: "SIM-1".to_owned() })
            .await
            .unwrap();

        let cancelled = store
            .update_order_status(order.id, OrderStatus::Processing, OrderStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(store.get_product(band.id).await.unwrap().unwrap().stock_quantity, 5);
    }

    #[tokio::test]
    async fn stale_status_update_conflicts() {
        let store = MemoryStore::new();
        let band = store.create_product(new_product("Band", 10_000, 5)).await.unwrap();
        let user = customer(&store, "a@example.com").await;
        let order = store
            .create_order(new_order(user.id, "k", &[(band.id, 1)]), &ShippingPolicy::default())
            .await
            .unwrap()
            .into_order();

        let err = store
            .update_order_status(order.id, OrderStatus::Processing, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn adjust_stock_never_goes_negative() {
        let store = MemoryStore::new();
        let band = store.create_product(new_product("Band", 10_000, 2)).await.unwrap();

        assert!(matches!(
            store.adjust_stock(band.id, -3).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert_eq!(store.adjust_stock(band.id, 4).await.unwrap().stock_quantity, 6);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        customer(&store, "a@example.com").await;
        let err = store
            .create_user(NewUser {
                email: Email::parse("A@example.com").unwrap(),
                name: "Again".to_owned(),
                password_hash: "hash".to_owned(),
                role: UserRole::Customer,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_product_empties_it_from_carts() {
        let store = MemoryStore::new();
        let band = store.create_product(new_product("Band", 10_000, 5)).await.unwrap();
        let user = customer(&store, "a@example.com").await;
        store.add_to_cart(user.id, band.id, 2).await.unwrap();
        store.add_to_cart(user.id, band.id, 1).await.unwrap();
        assert_eq!(store.cart_lines(user.id).await.unwrap()[0].quantity, 3);

        store.delete_product(band.id).await.unwrap();
        assert!(store.cart_lines(user.id).await.unwrap().is_empty());
        assert!(
            store
                .all_active_products()
                .await
                .unwrap()
                .iter()
                .all(|p| p.id != band.id)
        );
    }

    #[tokio::test]
    async fn revenue_counts_paid_orders_only() {
        let store = MemoryStore::new();
        let band = store.create_product(new_product("Band", 10_000, 5)).await.unwrap();
        let user = customer(&store, "a@example.com").await;
        let policy = ShippingPolicy::default();

        let paid = store
            .create_order(new_order(user.id, "paid", &[(band.id, 1)]), &policy)
            .await
            .unwrap()
            .into_order();
        store
            .create_order(new_order(user.id, "unpaid", &[(band.id, 1)]), &policy)
            .await
            .unwrap();
        store
            .record_payment(paid.id, PaymentUpdate::Approved { reference: "SIM-1".to_owned() })
            .await
            .unwrap();

        let summary = store.summary(5, 10).await.unwrap();
        assert_eq!(summary.total_orders, 2);
        assert_eq!(summary.pending_orders, 1);
        assert_eq!(summary.total_revenue, paid.total);
        assert_eq!(summary.recent_orders.len(), 2);

        let top = store
            .top_products(Utc::now() - chrono::Duration::days(1), 5)
            .await
            .unwrap();
        assert_eq!(top[0].units_sold, 1);
    }

    #[tokio::test]
    async fn seeded_store_has_catalog() {
        let store = MemoryStore::seeded().unwrap();
        let page = store
            .list_products(&ProductFilter {
                category: Some(aurelia_core::ProductCategory::Watches),
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert!(page.total > 0);
        assert!(
            page.items
                .iter()
                .all(|p| p.category == aurelia_core::ProductCategory::Watches)
        );
    }
}
