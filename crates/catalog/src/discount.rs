use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedoc_core::ValueObject;

/// How a discount amount is expressed on a line or a price-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[default]
    None,
    /// `amount` is a percentage of the unit price (10 = 10%).
    Percent,
    /// `amount` is subtracted from the unit price.
    Fixed,
}

/// A discount amount together with its representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub amount: Decimal,
    pub discount_type: DiscountType,
}

impl Discount {
    pub const NONE: Discount = Discount {
        amount: Decimal::ZERO,
        discount_type: DiscountType::None,
    };

    pub fn percent(amount: Decimal) -> Self {
        Self {
            amount,
            discount_type: DiscountType::Percent,
        }
    }

    pub fn fixed(amount: Decimal) -> Self {
        Self {
            amount,
            discount_type: DiscountType::Fixed,
        }
    }

    /// True when applying this discount leaves the price unchanged.
    pub fn is_none(&self) -> bool {
        self.discount_type == DiscountType::None || self.amount.is_zero()
    }
}

impl Default for Discount {
    fn default() -> Self {
        Self::NONE
    }
}

impl ValueObject for Discount {}
