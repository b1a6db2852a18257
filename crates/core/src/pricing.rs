//! Order total calculation.
//!
//! Totals are always computed from unit prices read by the server, never from
//! amounts supplied by a client.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    /// Fee charged when the subtotal is below the threshold.
    pub flat_fee: Decimal,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
}

impl ShippingPolicy {
    #[must_use]
    pub const fn new(flat_fee: Decimal, free_shipping_threshold: Decimal) -> Self {
        Self {
            flat_fee,
            free_shipping_threshold,
        }
    }

    /// Shipping fee for a given subtotal. Empty orders ship for free.
    #[must_use]
    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal.is_zero() || subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_fee
        }
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self::new(Decimal::new(1500, 2), Decimal::new(50_000, 2))
    }
}

/// A unit price and quantity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl PricedLine {
    #[must_use]
    pub const fn new(unit_price: Decimal, quantity: u32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Computed totals for a cart or an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub item_count: u32,
}

impl OrderTotals {
    /// Compute totals for the given lines under a shipping policy.
    #[must_use]
    pub fn compute(lines: &[PricedLine], policy: &ShippingPolicy) -> Self {
        let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
        let item_count = lines.iter().map(|l| l.quantity).sum();
        let shipping_fee = policy.fee_for(subtotal);

        Self {
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
            item_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_totals_below_threshold_pay_shipping() {
        let policy = ShippingPolicy::new(dollars(1500), dollars(50_000));
        let totals = OrderTotals::compute(
            &[
                PricedLine::new(dollars(12_000), 2),
                PricedLine::new(dollars(4_550), 1),
            ],
            &policy,
        );

        assert_eq!(totals.subtotal, dollars(28_550));
        assert_eq!(totals.shipping_fee, dollars(1500));
        assert_eq!(totals.total, dollars(30_050));
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = ShippingPolicy::new(dollars(1500), dollars(50_000));
        let totals = OrderTotals::compute(&[PricedLine::new(dollars(25_000), 2)], &policy);

        assert_eq!(totals.shipping_fee, Decimal::ZERO);
        assert_eq!(totals.total, dollars(50_000));
    }

    #[test]
    fn test_empty_order_is_free() {
        let totals = OrderTotals::compute(&[], &ShippingPolicy::default());
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.item_count, 0);
    }
}
