//! Cart types.

use rust_decimal::Decimal;
use serde::Serialize;

use aurelia_core::{OrderTotals, PricedLine, ProductCategory, ProductId, ShippingPolicy};

/// A cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub category: ProductCategory,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    /// Current stock, so clients can warn before checkout.
    pub stock_quantity: i32,
    pub line_total: Decimal,
}

impl CartLine {
    #[must_use]
    pub fn priced(&self) -> PricedLine {
        PricedLine::new(self.unit_price, u32::try_from(self.quantity).unwrap_or(0))
    }
}

/// The caller's cart with computed totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

impl CartView {
    #[must_use]
    pub fn new(lines: Vec<CartLine>, shipping: &ShippingPolicy) -> Self {
        let priced: Vec<PricedLine> = lines.iter().map(CartLine::priced).collect();
        let totals = OrderTotals::compute(&priced, shipping);
        Self { lines, totals }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
