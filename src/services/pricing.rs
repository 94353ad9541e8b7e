//! Pricing calculator.
//!
//! Unit prices and tax rates always come from the catalog row read on the
//! server. Tax is charged per line on the pre-discount line subtotal at the
//! product's own rate. Shipping is a flat rate per method. The grand total is
//! rounded once, half away from zero, to two decimals.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ShippingConfig;
use crate::errors::ServiceError;
use crate::models::ShippingMethod;

/// Decimal places of the stored money columns.
pub const LEDGER_SCALE: u32 = 4;

/// Rounds to currency minor units, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub category_id: Option<Uuid>,
    pub unit_price: Decimal,
    pub quantity: i32,
    /// Percentage, e.g. `8` for 8%.
    pub tax_rate: Decimal,
    pub line_subtotal: Decimal,
    /// Held at [`LEDGER_SCALE`] places, not cents. The order-level tax is
    /// the sum of line taxes rounded once, so stored lines add up to it.
    pub line_tax: Decimal,
}

impl PricedLine {
    pub fn new(
        product_id: Uuid,
        category_id: Option<Uuid>,
        unit_price: Decimal,
        quantity: i32,
        tax_rate: Decimal,
    ) -> Self {
        let line_subtotal = unit_price * Decimal::from(quantity);
        let line_tax = (line_subtotal * tax_rate / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointAwayFromZero);
        Self {
            product_id,
            category_id,
            unit_price,
            quantity,
            tax_rate,
            line_subtotal,
            line_tax,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl Pricing {
    /// `total == subtotal - discount + shipping + tax` within one cent, and
    /// the total is never negative.
    pub fn is_consistent(&self) -> bool {
        let expected = self.subtotal - self.discount + self.shipping + self.tax;
        (self.total - expected).abs() <= Decimal::new(1, 2) && !self.total.is_sign_negative()
    }
}

#[derive(Debug, Clone)]
pub struct PricingCalculator {
    shipping: ShippingConfig,
}

impl PricingCalculator {
    pub fn new(shipping: ShippingConfig) -> Self {
        Self { shipping }
    }

    pub fn subtotal(lines: &[PricedLine]) -> Decimal {
        lines.iter().map(|l| l.line_subtotal).sum()
    }

    pub fn shipping_cost(&self, method: ShippingMethod, subtotal: Decimal) -> Decimal {
        let free = method == ShippingMethod::Standard
            && self
                .shipping
                .free_shipping_threshold
                .map_or(false, |threshold| subtotal >= threshold);
        if free {
            Decimal::ZERO
        } else {
            self.shipping.rate_for(method)
        }
    }

    pub fn price(
        &self,
        lines: &[PricedLine],
        discount: Decimal,
        method: ShippingMethod,
    ) -> Result<Pricing, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "Cannot price an empty cart".to_string(),
            ));
        }
        if discount.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "Discount cannot be negative".to_string(),
            ));
        }

        let subtotal = Self::subtotal(lines);
        let discount = discount.min(subtotal);
        let tax_raw: Decimal = lines.iter().map(|l| l.line_tax).sum();
        let shipping = self.shipping_cost(method, subtotal);

        let total = round_money(subtotal - discount + shipping + tax_raw);

        Ok(Pricing {
            subtotal,
            tax: round_money(tax_raw),
            shipping,
            discount,
            total,
        })
    }
}
