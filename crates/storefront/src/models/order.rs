//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aurelia_core::{
    Email, OrderId, OrderItemId, OrderStatus, OrderTotals, PaymentStatus, ProductId, UserId,
};

use super::product::Pagination;

/// Maximum length of a client-supplied idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Maximum quantity of one product per order line.
pub const MAX_LINE_QUANTITY: i32 = 99;

/// Where and to whom an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub full_name: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub phone: String,
    pub email: String,
}

fn default_country() -> String {
    "US".to_string()
}

impl ShippingDetails {
    /// Trim every field and check required ones.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn normalize(mut self) -> Result<Self, String> {
        for (field, value) in [
            ("full_name", &mut self.full_name),
            ("address_line1", &mut self.address_line1),
            ("city", &mut self.city),
            ("postal_code", &mut self.postal_code),
            ("country", &mut self.country),
            ("phone", &mut self.phone),
        ] {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(format!("{field} is required"));
            }
            if value.len() > 200 {
                return Err(format!("{field} is too long"));
            }
        }

        self.address_line2 = self
            .address_line2
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if !self
            .phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
            || self.phone.chars().filter(char::is_ascii_digit).count() < 6
        {
            return Err("phone must contain at least 6 digits".to_string());
        }

        self.email = Email::parse(&self.email)
            .map_err(|e| format!("email: {e}"))?
            .into_inner();

        Ok(self)
    }
}

/// A line on a placed order. Name and price are snapshots taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Reference returned by the payment processor on approval.
    pub payment_reference: Option<String>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub shipping: ShippingDetails,
    pub idempotency_key: String,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Human-facing order number, e.g. `AUR-000042`.
    #[must_use]
    pub fn number(&self) -> String {
        format!("AUR-{:06}", self.id.as_i32())
    }

    #[must_use]
    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Whether the owner may still cancel this order.
    #[must_use]
    pub fn is_cancellable_by_customer(&self) -> bool {
        self.status == OrderStatus::Pending && self.payment_status != PaymentStatus::Paid
    }

    /// Whether the order can accept a payment attempt.
    #[must_use]
    pub fn is_payable(&self) -> bool {
        self.status == OrderStatus::Pending && self.payment_status != PaymentStatus::Paid
    }
}

/// A requested line of a new order. Prices are never taken from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Merge duplicate products and sort by product id.
///
/// The ascending order is also the order in which stock rows are locked.
/// Returns `None` if a merged quantity overflows.
#[must_use]
pub fn merge_lines(lines: &[OrderLineRequest]) -> Option<Vec<OrderLineRequest>> {
    let mut merged: std::collections::BTreeMap<ProductId, i32> = std::collections::BTreeMap::new();
    for line in lines {
        let quantity = merged.entry(line.product_id).or_default();
        *quantity = quantity.checked_add(line.quantity)?;
    }
    Some(
        merged
            .into_iter()
            .map(|(product_id, quantity)| OrderLineRequest {
                product_id,
                quantity,
            })
            .collect(),
    )
}

/// Everything the store needs to place an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub idempotency_key: String,
    pub shipping: ShippingDetails,
    /// Already merged and sorted by product id.
    pub lines: Vec<OrderLineRequest>,
}

/// A product snapshot taken while decrementing its stock.
#[derive(Debug, Clone)]
pub struct ReservedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl ReservedLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Result of placing an order.
#[derive(Debug, Clone)]
pub enum OrderOutcome {
    /// A new order was created and stock was decremented.
    Created(Order),
    /// The idempotency key was already used; the original order is returned.
    Existing(Order),
}

impl OrderOutcome {
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Created(order) | Self::Existing(order) => order,
        }
    }

    #[must_use]
    pub fn into_order(self) -> Order {
        match self {
            Self::Created(order) | Self::Existing(order) => order,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Admin order listing filter.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub pagination: Pagination,
}

/// A payment attempt result to persist.
#[derive(Debug, Clone)]
pub enum PaymentUpdate {
    Approved { reference: String },
    Declined,
}

/// Totals stored with an order.
#[must_use]
pub fn totals_for(lines: &[ReservedLine], policy: &aurelia_core::ShippingPolicy) -> OrderTotals {
    let priced: Vec<aurelia_core::PricedLine> = lines
        .iter()
        .map(|l| aurelia_core::PricedLine::new(l.unit_price, u32::try_from(l.quantity).unwrap_or(0)))
        .collect();
    OrderTotals::compute(&priced, policy)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn details() -> ShippingDetails {
        ShippingDetails {
            full_name: "  Sari Wijaya ".to_string(),
            address_line1: "Jl. Sudirman 12".to_string(),
            address_line2: Some("   ".to_string()),
            city: "Jakarta".to_string(),
            postal_code: "10220".to_string(),
            country: "ID".to_string(),
            phone: "+62 812-3456-7890".to_string(),
            email: "Sari@Example.com".to_string(),
        }
    }

    #[test]
    fn test_shipping_details_normalize() {
        let d = details().normalize().unwrap();
        assert_eq!(d.full_name, "Sari Wijaya");
        assert_eq!(d.address_line2, None);
        assert_eq!(d.email, "sari@example.com");
    }

    #[test]
    fn test_shipping_details_require_fields() {
        let mut d = details();
        d.city = " ".to_string();
        assert_eq!(d.normalize().unwrap_err(), "city is required");

        let mut d = details();
        d.phone = "call me".to_string();
        assert!(d.normalize().is_err());
    }

    #[test]
    fn test_merge_lines_sums_and_sorts() {
        let merged = merge_lines(&[
            OrderLineRequest { product_id: ProductId::new(7), quantity: 1 },
            OrderLineRequest { product_id: ProductId::new(2), quantity: 2 },
            OrderLineRequest { product_id: ProductId::new(7), quantity: 3 },
        ]);
        assert_eq!(
            merged,
            Some(vec![
                OrderLineRequest { product_id: ProductId::new(2), quantity: 2 },
                OrderLineRequest { product_id: ProductId::new(7), quantity: 4 },
            ])
        );
    }

    #[test]
    fn test_merge_lines_overflow() {
        let line = OrderLineRequest { product_id: ProductId::new(1), quantity: i32::MAX };
        assert_eq!(merge_lines(&[line, line]), None);
    }

    #[test]
    fn test_totals_for_reserved_lines() {
        let lines = vec![ReservedLine {
            product_id: ProductId::new(1),
            product_name: "Band".to_string(),
            unit_price: Decimal::new(12_500, 2),
            quantity: 2,
        }];
        let totals = totals_for(&lines, &aurelia_core::ShippingPolicy::default());
        assert_eq!(totals.subtotal, Decimal::new(25_000, 2));
        assert_eq!(totals.shipping_fee, Decimal::new(1_500, 2));
        assert_eq!(totals.total, Decimal::new(26_500, 2));
    }
}
