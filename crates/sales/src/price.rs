//! Unit-price arithmetic: discounts and tax-inclusive/exclusive conversion.

use rust_decimal::Decimal;

use tradedoc_catalog::{Discount, DiscountType};
use tradedoc_core::{DEFAULT_SCALE, RoundingMode, round};

/// Discounted unit price.
///
/// - `Percent d`: `round(price × (100 − d) / 100, scale, HALF_UP)`
/// - `Fixed d`: `price − d`
/// - `None`: `price`
pub fn compute_discount(price: Decimal, discount: Discount, unit_price_scale: u32) -> Decimal {
    match discount.discount_type {
        DiscountType::Percent => round(
            price * (Decimal::ONE_HUNDRED - discount.amount) / Decimal::ONE_HUNDRED,
            unit_price_scale,
            RoundingMode::HalfUp,
        ),
        DiscountType::Fixed => price - discount.amount,
        DiscountType::None => price,
    }
}

/// Express a discount as a percentage of `price` so that percent and fixed
/// discounts can be compared.
pub fn discount_as_percent(discount: Discount, price: Decimal) -> Decimal {
    match discount.discount_type {
        DiscountType::Percent => discount.amount,
        DiscountType::Fixed if !price.is_zero() => round(
            discount.amount / price * Decimal::ONE_HUNDRED,
            DEFAULT_SCALE,
            RoundingMode::HalfUp,
        ),
        DiscountType::Fixed | DiscountType::None => Decimal::ZERO,
    }
}

/// Convert a unit price between its tax-exclusive and tax-inclusive forms.
///
/// `tax_fraction` is the rate as a fraction (0.20 for 20%). With `to_ati` the
/// price is multiplied by `1 + rate`, otherwise divided by it.
pub fn convert_unit_price(
    price: Decimal,
    tax_fraction: Decimal,
    to_ati: bool,
    unit_price_scale: u32,
) -> Decimal {
    let factor = Decimal::ONE + tax_fraction;
    let converted = if to_ati { price * factor } else { price / factor };
    round(converted, unit_price_scale, RoundingMode::HalfUp)
}
