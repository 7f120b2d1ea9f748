use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedoc_core::{CategoryId, PriceListId, ProductId};

use crate::discount::Discount;

/// What a matching price-list line does to the unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PriceListAdjustment {
    /// Apply a discount to the unit price.
    Discount(Discount),
    /// Replace the unit price outright (no discount).
    ReplacePrice { price: Decimal },
}

/// Catalog discount/override rule matched by product (or category) and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListLine {
    pub product_id: Option<ProductId>,
    pub category_id: Option<CategoryId>,
    /// Minimum ordered quantity for the line to apply.
    pub min_qty: Decimal,
    pub adjustment: PriceListAdjustment,
}

impl PriceListLine {
    /// A line matches on product first; category lines apply only when the line
    /// targets no product.
    pub fn matches(
        &self,
        product_id: ProductId,
        category_id: Option<CategoryId>,
        quantity: Decimal,
    ) -> bool {
        if quantity < self.min_qty {
            return false;
        }
        match (self.product_id, self.category_id) {
            (Some(p), _) => p == product_id,
            (None, Some(c)) => category_id == Some(c),
            (None, None) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    pub id: PriceListId,
    pub name: String,
    /// Fold discounts into the unit price instead of showing them on the line.
    pub hide_discount: bool,
    pub lines: Vec<PriceListLine>,
}
