//! Decimal rounding rules shared by every commercial computation.
//!
//! Amounts are `rust_decimal::Decimal` end to end. Totals and rates are rounded to
//! [`DEFAULT_SCALE`] places half-up; unit prices and quantities use the scales
//! configured by the caller.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Scale of monetary totals, tax totals and percentage rates.
pub const DEFAULT_SCALE: u32 = 2;

/// Rounding mode applied when a value is brought back to a fixed scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Midpoint rounds away from zero (2.345 -> 2.35, -2.345 -> -2.35).
    HalfUp,
    /// Midpoint rounds to the even neighbour (2.345 -> 2.34, 2.355 -> 2.36).
    HalfEven,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

/// Round `value` to `scale` decimal places and pin the scale (so `9` becomes `9.00`).
pub fn round(value: Decimal, scale: u32, mode: RoundingMode) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, mode.strategy());
    rounded.rescale(scale);
    rounded
}

/// Line amount: `round(qty × price, 2, HALF_UP)`.
pub fn compute_amount(quantity: Decimal, price: Decimal) -> Decimal {
    round(quantity * price, DEFAULT_SCALE, RoundingMode::HalfUp)
}

/// Percentage of `numerator` over `denominator`.
///
/// Zero when the denominator is zero, else `round(100 × numerator / denominator, 2, HALF_UP)`.
pub fn percent_rate(denominator: Decimal, numerator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    round(
        Decimal::ONE_HUNDRED * numerator / denominator,
        DEFAULT_SCALE,
        RoundingMode::HalfUp,
    )
}
