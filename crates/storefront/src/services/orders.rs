//! Checkout and order lifecycle.

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use aurelia_core::{OrderId, OrderStatus, ProductId, ShippingPolicy};

use super::payment::{CardDetails, PaymentError, PaymentOutcome, PaymentSimulator};
use crate::db::{CartStore, OrderStore, RepositoryError};
use crate::models::order::{MAX_IDEMPOTENCY_KEY_LEN, MAX_LINE_QUANTITY, merge_lines};
use crate::models::{
    CurrentUser, NewOrder, Order, OrderFilter, OrderLineRequest, OrderOutcome, OrderSummary, Page,
    PaymentUpdate, ShippingDetails,
};

/// Maximum number of distinct lines in one order.
const MAX_ORDER_LINES: usize = 50;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("cannot place an empty order")]
    EmptyOrder,

    #[error("order not found")]
    NotFound,

    #[error("insufficient stock for {product}: {available} available, {requested} requested")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),

    #[error("only pending, unpaid orders can be cancelled")]
    NotCancellable,

    #[error("order is not awaiting payment")]
    NotPayable,

    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Payment declined")]
    PaymentDeclined,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for OrderError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::InsufficientStock {
                product,
                available,
                requested,
            } => Self::InsufficientStock {
                product,
                available,
                requested,
            },
            RepositoryError::MissingProduct(id) => Self::ProductUnavailable(id),
            other => Self::Repository(other),
        }
    }
}

/// Checkout request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// Lines to order. When absent, the caller's cart is ordered.
    #[serde(default)]
    pub items: Option<Vec<OrderLineRequest>>,
    pub shipping: ShippingDetails,
    /// Used when no `Idempotency-Key` header is sent.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Order placement, payment and status changes.
pub struct OrderService<'a, S> {
    store: &'a S,
    shipping: &'a ShippingPolicy,
}

impl<'a, S: OrderStore + CartStore> OrderService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, shipping: &'a ShippingPolicy) -> Self {
        Self { store, shipping }
    }

    /// Place an order from explicit lines or from the caller's cart.
    ///
    /// The idempotency key comes from `header_key`, then the body, and is
    /// generated when neither is present. Replaying a key returns the
    /// original order before the body is looked at, so a retry still works
    /// after the first attempt emptied the cart. A new order placed from the
    /// cart empties the cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` or `OrderError::EmptyOrder` for bad
    /// input, `OrderError::InsufficientStock` or `OrderError::ProductUnavailable`
    /// when a line cannot be fulfilled (nothing is changed in that case).
    #[instrument(skip(self, request), fields(user_id = %user.id))]
    pub async fn checkout(
        &self,
        user: &CurrentUser,
        request: CheckoutRequest,
        header_key: Option<String>,
    ) -> Result<OrderOutcome, OrderError> {
        let idempotency_key = resolve_key(header_key.or(request.idempotency_key))?;
        if let Some(existing) = self
            .store
            .find_order_by_idempotency_key(user.id, &idempotency_key)
            .await?
        {
            info!(order_id = %existing.id, "Replayed idempotency key");
            return Ok(OrderOutcome::Existing(existing));
        }

        let shipping = request.shipping.normalize().map_err(OrderError::Validation)?;

        let from_cart = request.items.is_none();
        let requested = match request.items {
            Some(items) => items,
            None => self
                .store
                .cart_lines(user.id)
                .await?
                .into_iter()
                .map(|line| OrderLineRequest {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
        };
        let lines = validate_lines(&requested)?;

        let outcome = self
            .store
            .create_order(
                NewOrder {
                    user_id: user.id,
                    idempotency_key,
                    shipping,
                    lines,
                },
                self.shipping,
            )
            .await?;

        match &outcome {
            OrderOutcome::Created(order) => {
                info!(order_id = %order.id, total = %order.total, "Order placed");
                if from_cart {
                    self.store.clear_cart(user.id).await?;
                }
            }
            OrderOutcome::Existing(order) => {
                info!(order_id = %order.id, "Replayed idempotency key");
            }
        }
        Ok(outcome)
    }

    /// An order visible to the caller: their own, or any order for an admin.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs
    /// to someone else.
    pub async fn get_for(&self, user: &CurrentUser, id: OrderId) -> Result<Order, OrderError> {
        self.store
            .get_order(id)
            .await?
            .filter(|o| o.user_id == user.id || user.is_admin())
            .ok_or(OrderError::NotFound)
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_for(&self, user: &CurrentUser) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_orders_for_user(user.id).await?)
    }

    /// Charge a card for one of the caller's orders.
    ///
    /// A decline is recorded on the order (payment `failed`, status still
    /// `pending`) before `OrderError::PaymentDeclined` is returned, so the
    /// customer can retry with another card.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Payment` for invalid card details,
    /// `OrderError::NotPayable` if the order is not pending or already paid,
    /// and `OrderError::PaymentDeclined` when the card declines.
    #[instrument(skip(self, card), fields(user_id = %user.id))]
    pub async fn pay(
        &self,
        user: &CurrentUser,
        id: OrderId,
        card: &CardDetails,
    ) -> Result<Order, OrderError> {
        let order = self.owned(user, id).await?;
        if !order.is_payable() {
            return Err(OrderError::NotPayable);
        }

        match PaymentSimulator.charge(card, Utc::now().date_naive())? {
            PaymentOutcome::Approved { reference } => {
                let order = self
                    .store
                    .record_payment(id, PaymentUpdate::Approved { reference })
                    .await
                    .map_err(not_payable_on_conflict)?;
                info!(order_id = %id, "Payment approved");
                Ok(order)
            }
            PaymentOutcome::Declined => {
                self.store
                    .record_payment(id, PaymentUpdate::Declined)
                    .await
                    .map_err(not_payable_on_conflict)?;
                warn!(order_id = %id, "Payment declined");
                Err(OrderError::PaymentDeclined)
            }
        }
    }

    /// Cancel one of the caller's own orders. Stock is restored.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotCancellable` unless the order is pending and unpaid.
    #[instrument(skip(self), fields(user_id = %user.id))]
    pub async fn cancel(&self, user: &CurrentUser, id: OrderId) -> Result<Order, OrderError> {
        let order = self.owned(user, id).await?;
        if !order.is_cancellable_by_customer() {
            return Err(OrderError::NotCancellable);
        }

        let order = self
            .store
            .update_order_status(id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::NotCancellable,
                other => other.into(),
            })?;
        info!(order_id = %id, "Order cancelled by customer");
        Ok(order)
    }

    /// Move an order to a new status (admin).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the lifecycle does not allow it.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, to: OrderStatus) -> Result<Order, OrderError> {
        let order = self.store.get_order(id).await?.ok_or(OrderError::NotFound)?;
        let from = order.status;
        if !from.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        let order = self
            .store
            .update_order_status(id, from, to)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::InvalidTransition { from, to },
                other => other.into(),
            })?;
        info!(order_id = %id, %from, %to, "Order status changed");
        Ok(order)
    }

    /// All orders for the admin listing.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_all(&self, filter: &OrderFilter) -> Result<Page<OrderSummary>, OrderError> {
        Ok(self.store.list_orders(filter).await?)
    }

    async fn owned(&self, user: &CurrentUser, id: OrderId) -> Result<Order, OrderError> {
        self.store
            .get_order(id)
            .await?
            .filter(|o| o.user_id == user.id)
            .ok_or(OrderError::NotFound)
    }
}

fn not_payable_on_conflict(e: RepositoryError) -> OrderError {
    match e {
        RepositoryError::Conflict(_) => OrderError::NotPayable,
        other => other.into(),
    }
}

fn resolve_key(key: Option<String>) -> Result<String, OrderError> {
    let Some(key) = key.map(|k| k.trim().to_owned()) else {
        return Ok(Uuid::new_v4().to_string());
    };
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(OrderError::Validation(format!(
            "idempotency key must be between 1 and {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(OrderError::Validation(
            "idempotency key contains control characters".to_owned(),
        ));
    }
    Ok(key)
}

fn validate_lines(lines: &[OrderLineRequest]) -> Result<Vec<OrderLineRequest>, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    if lines.iter().any(|l| l.quantity < 1) {
        return Err(OrderError::Validation("quantity must be at least 1".to_owned()));
    }
    let too_many = || {
        OrderError::Validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY} per product"
        ))
    };
    if lines.iter().any(|l| l.quantity > MAX_LINE_QUANTITY) {
        return Err(too_many());
    }

    let merged = merge_lines(lines).ok_or_else(too_many)?;
    if merged.len() > MAX_ORDER_LINES {
        return Err(OrderError::Validation(format!(
            "an order can contain at most {MAX_ORDER_LINES} products"
        )));
    }
    if merged.iter().any(|l| l.quantity > MAX_LINE_QUANTITY) {
        return Err(too_many());
    }
    Ok(merged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use aurelia_core::{Email, PaymentStatus, UserRole};

    use super::*;
    use crate::db::{CatalogStore, MemoryStore, UserStore};
    use crate::models::{NewProduct, NewUser};

    struct Fixture {
        store: MemoryStore,
        shipping: ShippingPolicy,
        customer: CurrentUser,
        product: ProductId,
    }

    impl Fixture {
        async fn new(stock: i32) -> Self {
            let store = MemoryStore::new();
            let product = store
                .create_product(NewProduct {
                    slug: None,
                    name: "Pearl Drop Earrings".to_owned(),
                    description: String::new(),
                    category: aurelia_core::ProductCategory::Earrings,
                    material: "14k Yellow Gold".to_owned(),
                    gemstone: Some("Pearl".to_owned()),
                    price: Decimal::new(34_000, 2),
                    stock_quantity: stock,
                    image_url: None,
                    is_featured: false,
                })
                .await
                .unwrap();
            let user = store
                .create_user(NewUser {
                    email: Email::parse("buyer@example.com").unwrap(),
                    name: "Buyer".to_owned(),
                    password_hash: "hash".to_owned(),
                    role: UserRole::Customer,
                })
                .await
                .unwrap();

            Self {
                store,
                shipping: ShippingPolicy::default(),
                customer: CurrentUser::from(&user),
                product: product.id,
            }
        }

        fn service(&self) -> OrderService<'_, MemoryStore> {
            OrderService::new(&self.store, &self.shipping)
        }

        fn request(&self, quantity: i32) -> CheckoutRequest {
            CheckoutRequest {
                items: Some(vec![OrderLineRequest {
                    product_id: self.product,
                    quantity,
                }]),
                shipping: ShippingDetails {
                    full_name: "Buyer".to_owned(),
                    address_line1: "1 Main St".to_owned(),
                    address_line2: None,
                    city: "Springfield".to_owned(),
                    postal_code: "12345".to_owned(),
                    country: "US".to_owned(),
                    phone: "555-0100".to_owned(),
                    email: "buyer@example.com".to_owned(),
                },
                idempotency_key: None,
            }
        }

        async fn stock(&self) -> i32 {
            self.store
                .get_product(self.product)
                .await
                .unwrap()
                .unwrap()
                .stock_quantity
        }
    }

    fn card(number: &str) -> CardDetails {
        CardDetails {
            card_number: number.to_owned(),
            expiry: "12/99".to_owned(),
            cvv: "123".to_owned(),
            cardholder: "Buyer".to_owned(),
        }
    }

    #[tokio::test]
    async fn checkout_prices_from_store() {
        let f = Fixture::new(5).await;
        let order = f
            .service()
            .checkout(&f.customer, f.request(2), Some("k1".to_owned()))
            .await
            .unwrap()
            .into_order();

        assert_eq!(order.subtotal, Decimal::new(68_000, 2));
        assert_eq!(order.shipping_fee, Decimal::ZERO);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(f.stock().await, 3);
    }

    #[tokio::test]
    async fn checkout_insufficient_stock_leaves_stock() {
        let f = Fixture::new(1).await;
        let err = f
            .service()
            .checkout(&f.customer, f.request(2), None)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InsufficientStock { available: 1, requested: 2, .. }));
        assert_eq!(f.stock().await, 1);
    }

    #[tokio::test]
    async fn header_key_wins_over_body() {
        let f = Fixture::new(5).await;
        let mut request = f.request(1);
        request.idempotency_key = Some("body".to_owned());

        let first = f
            .service()
            .checkout(&f.customer, request.clone(), Some("header".to_owned()))
            .await
            .unwrap();
        assert_eq!(first.order().idempotency_key, "header");

        let replay = f
            .service()
            .checkout(&f.customer, request, Some("header".to_owned()))
            .await
            .unwrap();
        assert!(!replay.is_created());
        assert_eq!(f.stock().await, 4);
    }

    #[tokio::test]
    async fn cart_checkout_replay_returns_original() {
        let f = Fixture::new(5).await;
        f.store.add_to_cart(f.customer.id, f.product, 2).await.unwrap();
        let mut request = f.request(1);
        request.items = None;

        let first = f
            .service()
            .checkout(&f.customer, request.clone(), Some("retry-key".to_owned()))
            .await
            .unwrap();
        assert!(first.is_created());
        assert!(f.store.cart_lines(f.customer.id).await.unwrap().is_empty());

        // The cart is empty and the shipping details changed; the key still wins.
        request.shipping.full_name = String::new();
        let replay = f
            .service()
            .checkout(&f.customer, request, Some("retry-key".to_owned()))
            .await
            .unwrap();
        assert!(!replay.is_created());
        assert_eq!(replay.order().id, first.order().id);
        assert_eq!(f.stock().await, 3);
    }

    #[tokio::test]
    async fn oversized_merged_lines_rejected() {
        let f = Fixture::new(5).await;
        let mut request = f.request(i32::MAX);
        if let Some(items) = request.items.as_mut() {
            items.push(OrderLineRequest {
                product_id: f.product,
                quantity: i32::MAX,
            });
        }

        assert!(matches!(
            f.service().checkout(&f.customer, request, None).await,
            Err(OrderError::Validation(_))
        ));
        assert_eq!(f.stock().await, 5);
    }

    #[tokio::test]
    async fn checkout_from_cart_clears_it() {
        let f = Fixture::new(5).await;
        f.store.add_to_cart(f.customer.id, f.product, 2).await.unwrap();
        let mut request = f.request(1);
        request.items = None;

        let order = f
            .service()
            .checkout(&f.customer, request, None)
            .await
            .unwrap()
            .into_order();

        assert_eq!(order.item_count(), 2);
        assert!(f.store.cart_lines(f.customer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_cart_checkout_rejected() {
        let f = Fixture::new(5).await;
        let mut request = f.request(1);
        request.items = None;
        assert!(matches!(
            f.service().checkout(&f.customer, request, None).await,
            Err(OrderError::EmptyOrder)
        ));
    }

    #[tokio::test]
    async fn payment_approval_and_decline() {
        let f = Fixture::new(5).await;
        let service = f.service();
        let order = service
            .checkout(&f.customer, f.request(1), None)
            .await
            .unwrap()
            .into_order();

        let declined = service.pay(&f.customer, order.id, &card("4000000000000002")).await;
        assert!(matches!(declined, Err(OrderError::PaymentDeclined)));
        let after_decline = service.get_for(&f.customer, order.id).await.unwrap();
        assert_eq!(after_decline.payment_status, PaymentStatus::Failed);
        assert_eq!(after_decline.status, OrderStatus::Pending);

        let paid = service
            .pay(&f.customer, order.id, &card("4242424242424242"))
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.status, OrderStatus::Processing);
        assert!(paid.payment_reference.unwrap().starts_with("SIM-"));

        assert!(matches!(
            service.pay(&f.customer, order.id, &card("4242424242424242")).await,
            Err(OrderError::NotPayable)
        ));
        assert!(matches!(
            service.cancel(&f.customer, order.id).await,
            Err(OrderError::NotCancellable)
        ));
    }

    #[tokio::test]
    async fn other_customers_cannot_see_order() {
        let f = Fixture::new(5).await;
        let order = f
            .service()
            .checkout(&f.customer, f.request(1), None)
            .await
            .unwrap()
            .into_order();

        let stranger = CurrentUser {
            id: aurelia_core::UserId::new(999),
            email: Email::parse("x@example.com").unwrap(),
            name: "X".to_owned(),
            role: UserRole::Customer,
        };
        assert!(matches!(
            f.service().get_for(&stranger, order.id).await,
            Err(OrderError::NotFound)
        ));

        let admin = CurrentUser {
            role: UserRole::Admin,
            ..stranger
        };
        assert!(f.service().get_for(&admin, order.id).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_restocks() {
        let f = Fixture::new(5).await;
        let order = f
            .service()
            .checkout(&f.customer, f.request(3), None)
            .await
            .unwrap()
            .into_order();
        assert_eq!(f.stock().await, 2);

        let cancelled = f.service().cancel(&f.customer, order.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(f.stock().await, 5);
    }

    #[tokio::test]
    async fn admin_transitions_are_validated() {
        let f = Fixture::new(5).await;
        let order = f
            .service()
            .checkout(&f.customer, f.request(1), None)
            .await
            .unwrap()
            .into_order();

        assert!(matches!(
            f.service().update_status(order.id, OrderStatus::Delivered).await,
            Err(OrderError::InvalidTransition { .. })
        ));
        f.service()
            .update_status(order.id, OrderStatus::Processing)
            .await
            .unwrap();
        let shipped = f
            .service()
            .update_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
    }

    #[test]
    fn test_validate_lines() {
        let line = |id, quantity| OrderLineRequest {
            product_id: ProductId::new(id),
            quantity,
        };
        assert!(matches!(validate_lines(&[]), Err(OrderError::EmptyOrder)));
        assert!(matches!(validate_lines(&[line(1, 0)]), Err(OrderError::Validation(_))));
        assert!(matches!(
            validate_lines(&[line(1, 60), line(1, 40)]),
            Err(OrderError::Validation(_))
        ));
        assert!(matches!(
            validate_lines(&[line(1, i32::MAX), line(1, i32::MAX)]),
            Err(OrderError::Validation(_))
        ));
        assert!(matches!(
            validate_lines(&[line(1, 100), line(1, -1)]),
            Err(OrderError::Validation(_))
        ));
        assert_eq!(validate_lines(&[line(1, 50), line(1, 49)]).unwrap()[0].quantity, 99);
        assert_eq!(validate_lines(&[line(2, 1), line(1, 1)]).unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_key() {
        assert_eq!(resolve_key(Some(" abc ".to_owned())).unwrap(), "abc");
        assert!(resolve_key(Some(String::new())).is_err());
        assert!(resolve_key(Some("x".repeat(129))).is_err());
        assert_eq!(resolve_key(None).unwrap().len(), 36);
    }
}
