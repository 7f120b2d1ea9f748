//! Catalog records consumed by the commercial-document core.
//!
//! Everything here is immutable reference data (products, categories, taxes, price
//! lists, pack templates, pricing rules). The core reads these records; it never
//! mutates them.

pub mod discount;
pub mod pack;
pub mod price_list;
pub mod pricing_rule;
pub mod product;
pub mod tax;

pub use discount::{Discount, DiscountType};
pub use pack::{LineType, PackLineTemplate, PackTemplate};
pub use price_list::{PriceList, PriceListAdjustment, PriceListLine};
pub use pricing_rule::{PricingEffect, PricingRule};
pub use product::{Product, ProductCategory, Unit};
pub use tax::{FiscalPosition, TaxEquivalence, TaxRate};
