use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedoc_core::{CategoryId, CurrencyCode, Entity, ProductId, TaxRateId, ValueObject};

/// Unit of measure (e.g. `"unit"`, `"kg"`, `"h"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit(pub String);

impl Unit {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Unit {}

/// Sellable catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    /// Catalog sale price, expressed in `sale_currency`.
    pub sale_price: Decimal,
    pub sale_currency: CurrencyCode,
    /// Whether `sale_price` is tax-inclusive.
    pub in_ati: bool,
    /// Unit cost, in the selling company's currency.
    pub cost_price: Decimal,
    pub sales_unit: Option<Unit>,
    pub unit: Option<Unit>,
    /// Default sale tax before any fiscal-position substitution.
    pub sale_tax_id: Option<TaxRateId>,
}

impl Product {
    /// Sales unit, falling back to the product's base unit.
    pub fn selling_unit(&self) -> Option<&Unit> {
        self.sales_unit.as_ref().or(self.unit.as_ref())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Node of the product-category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    /// Maximum authorised discount in percent; zero means "inherit from parent".
    pub max_discount: Decimal,
}

impl Entity for ProductCategory {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
