use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedoc_core::{CategoryId, CompanyId, PricingRuleId, ProductId};

use crate::discount::Discount;

/// Effect a pricing rule has on a line when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PricingEffect {
    /// Tax-exclusive unit price in the order currency.
    pub unit_price: Option<Decimal>,
    pub discount: Option<Discount>,
}

/// Root pricing rule, keyed by company and product or category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: PricingRuleId,
    pub name: String,
    pub company_id: CompanyId,
    pub product_id: Option<ProductId>,
    pub category_id: Option<CategoryId>,
    pub effect: PricingEffect,
}

impl PricingRule {
    pub fn matches(
        &self,
        company_id: CompanyId,
        product_id: ProductId,
        category_id: Option<CategoryId>,
    ) -> bool {
        if self.company_id != company_id {
            return false;
        }
        match (self.product_id, self.category_id) {
            (Some(p), _) => p == product_id,
            (None, Some(c)) => category_id == Some(c),
            (None, None) => true,
        }
    }
}
