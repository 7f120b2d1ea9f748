//! In-memory implementation of every collaborator trait.
//!
//! Intended for tests, demos and the CLI. Exchange rates are not date-effective:
//! the `as_of` date is accepted and ignored.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedoc_catalog::{
    Discount, FiscalPosition, PackTemplate, PriceList, PriceListAdjustment, PriceListLine,
    PricingEffect, PricingRule, Product, ProductCategory, TaxEquivalence, TaxRate,
};
use tradedoc_core::{
    CategoryId, CurrencyCode, DomainError, DomainResult, PackId, PriceListId, ProductId, TaxRateId,
};
use tradedoc_parties::Company;

use crate::order::OrderLine;
use crate::price::compute_discount;
use crate::services::{
    CategoryMaxDiscountLookup, CurrencyConverter, PriceListResolution, PriceListService,
    PricingContext, PricingRuleEngine, ProductCatalog, TaxRateResolver,
};

/// `1 from = rate to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
}

/// Serializable catalog content, as loaded from a scenario file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogData {
    pub products: Vec<Product>,
    pub categories: Vec<ProductCategory>,
    pub taxes: Vec<TaxRate>,
    pub exchange_rates: Vec<ExchangeRate>,
    pub price_lists: Vec<PriceList>,
    pub pricing_rules: Vec<PricingRule>,
    pub packs: Vec<PackTemplate>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: HashMap<ProductId, Product>,
    categories: HashMap<CategoryId, ProductCategory>,
    taxes: HashMap<TaxRateId, TaxRate>,
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
    price_lists: HashMap<PriceListId, PriceList>,
    pricing_rules: Vec<PricingRule>,
    packs: HashMap<PackId, PackTemplate>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: CatalogData) -> Self {
        let mut catalog = Self::new();
        for product in data.products {
            catalog = catalog.with_product(product);
        }
        for category in data.categories {
            catalog = catalog.with_category(category);
        }
        for tax in data.taxes {
            catalog = catalog.with_tax(tax);
        }
        for rate in data.exchange_rates {
            catalog = catalog.with_rate(rate.from, rate.to, rate.rate);
        }
        for price_list in data.price_lists {
            catalog = catalog.with_price_list(price_list);
        }
        for rule in data.pricing_rules {
            catalog = catalog.with_pricing_rule(rule);
        }
        for pack in data.packs {
            catalog = catalog.with_pack(pack);
        }
        catalog
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.insert(product.id, product);
        self
    }

    pub fn with_category(mut self, category: ProductCategory) -> Self {
        self.categories.insert(category.id, category);
        self
    }

    pub fn with_tax(mut self, tax: TaxRate) -> Self {
        self.taxes.insert(tax.id, tax);
        self
    }

    pub fn with_rate(mut self, from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }

    pub fn with_price_list(mut self, price_list: PriceList) -> Self {
        self.price_lists.insert(price_list.id, price_list);
        self
    }

    /// Rules are matched in insertion order.
    pub fn with_pricing_rule(mut self, rule: PricingRule) -> Self {
        self.pricing_rules.push(rule);
        self
    }

    pub fn with_pack(mut self, pack: PackTemplate) -> Self {
        self.packs.insert(pack.id, pack);
        self
    }

    pub fn tax(&self, id: TaxRateId) -> Option<&TaxRate> {
        self.taxes.get(&id)
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    fn pack(&self, id: PackId) -> Option<&PackTemplate> {
        self.packs.get(&id)
    }
}

impl CurrencyConverter for InMemoryCatalog {
    fn convert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
        _as_of: NaiveDate,
    ) -> DomainResult<Decimal> {
        if from == to || amount.is_zero() {
            return Ok(amount);
        }
        if let Some(rate) = self.rates.get(&(from.clone(), to.clone())) {
            return Ok(amount * rate);
        }
        match self.rates.get(&(to.clone(), from.clone())) {
            Some(rate) if !rate.is_zero() => Ok(amount / rate),
            _ => Err(DomainError::configuration(format!(
                "no exchange rate from {from} to {to}"
            ))),
        }
    }
}

impl TaxRateResolver for InMemoryCatalog {
    fn tax_line_for(
        &self,
        _date: NaiveDate,
        product: &Product,
        _company: &Company,
        fiscal_position: Option<&FiscalPosition>,
    ) -> DomainResult<TaxRate> {
        let base = product.sale_tax_id.ok_or_else(|| {
            DomainError::configuration(format!("product '{}' has no sale tax", product.code))
        })?;
        let effective = fiscal_position
            .and_then(|fp| fp.equivalence_for(base))
            .map(|eq| eq.to_tax_id)
            .unwrap_or(base);

        self.taxes
            .get(&effective)
            .cloned()
            .ok_or_else(|| DomainError::configuration(format!("unknown tax rate {effective}")))
    }

    fn tax_equivalence_for(
        &self,
        product: &Product,
        _company: &Company,
        fiscal_position: Option<&FiscalPosition>,
    ) -> Option<TaxEquivalence> {
        let base = product.sale_tax_id?;
        fiscal_position?.equivalence_for(base).cloned()
    }
}

impl PricingRuleEngine for InMemoryCatalog {
    fn match_root_rule(
        &self,
        company: &Company,
        product: &Product,
        category_id: Option<CategoryId>,
        _context: &PricingContext,
    ) -> Option<PricingRule> {
        let mut matching = self
            .pricing_rules
            .iter()
            .filter(|rule| rule.matches(company.id, product.id, category_id));

        let first = matching.next()?;
        let others = matching.count();
        if others > 0 {
            tracing::warn!(
                product = %product.code,
                rule = %first.name,
                ignored = others,
                "several root pricing rules match; using the first"
            );
        }
        Some(first.clone())
    }

    fn apply(&self, rule: &PricingRule, _line: &OrderLine) -> PricingEffect {
        rule.effect
    }
}

impl PriceListService for InMemoryCatalog {
    fn line_for(
        &self,
        product: &Product,
        quantity: Decimal,
        price_list: PriceListId,
        _price: Decimal,
    ) -> Option<PriceListLine> {
        let list = self.price_lists.get(&price_list)?;
        let mut best: Option<&PriceListLine> = None;
        for line in list
            .lines
            .iter()
            .filter(|line| line.matches(product.id, product.category_id, quantity))
        {
            best = match best {
                Some(current) if current.min_qty >= line.min_qty => Some(current),
                _ => Some(line),
            };
        }
        best.cloned()
    }

    fn discount_and_replacement_price(
        &self,
        price_list: PriceListId,
        line: &PriceListLine,
        price: Decimal,
        unit_price_scale: u32,
    ) -> PriceListResolution {
        let hide_discount = self
            .price_lists
            .get(&price_list)
            .is_some_and(|list| list.hide_discount);

        match line.adjustment {
            PriceListAdjustment::ReplacePrice { price } => PriceListResolution {
                price,
                discount: Discount::NONE,
            },
            PriceListAdjustment::Discount(discount) if hide_discount => PriceListResolution {
                price: compute_discount(price, discount, unit_price_scale),
                discount: Discount::NONE,
            },
            PriceListAdjustment::Discount(discount) => PriceListResolution { price, discount },
        }
    }
}

impl CategoryMaxDiscountLookup for InMemoryCatalog {
    fn category(&self, id: CategoryId) -> Option<&ProductCategory> {
        self.categories.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eur() -> CurrencyCode {
        CurrencyCode::new("EUR").unwrap()
    }

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn category(parent: Option<CategoryId>, max_discount: Decimal) -> ProductCategory {
        ProductCategory {
            id: CategoryId::new(),
            name: "cat".to_string(),
            parent_id: parent,
            max_discount,
        }
    }

    #[test]
    fn converts_with_direct_and_inverse_rates() {
        let catalog = InMemoryCatalog::new().with_rate(usd(), eur(), dec!(0.5));

        assert_eq!(catalog.convert(&usd(), &eur(), dec!(10), date()).unwrap(), dec!(5));
        assert_eq!(catalog.convert(&eur(), &usd(), dec!(5), date()).unwrap(), dec!(10));
        assert_eq!(catalog.convert(&eur(), &eur(), dec!(7), date()).unwrap(), dec!(7));

        let gbp = CurrencyCode::new("GBP").unwrap();
        match catalog.convert(&gbp, &eur(), dec!(1), date()) {
            Err(DomainError::Configuration(msg)) if msg.contains("GBP") => {}
            other => panic!("Expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn max_discount_walks_up_to_first_non_zero_ancestor() {
        let root = category(None, dec!(15));
        let middle = category(Some(root.id), Decimal::ZERO);
        let leaf = category(Some(middle.id), Decimal::ZERO);
        let leaf_id = leaf.id;
        let catalog = InMemoryCatalog::new()
            .with_category(root)
            .with_category(middle)
            .with_category(leaf);

        assert_eq!(catalog.max_discount_chain(leaf_id).unwrap(), dec!(15));
    }

    #[test]
    fn max_discount_is_zero_without_any_ceiling() {
        let lonely = category(None, Decimal::ZERO);
        let id = lonely.id;
        let catalog = InMemoryCatalog::new().with_category(lonely);

        assert_eq!(catalog.max_discount_chain(id).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn category_cycle_is_a_configuration_error() {
        let a_id = CategoryId::new();
        let b_id = CategoryId::new();
        let a = ProductCategory {
            id: a_id,
            name: "a".to_string(),
            parent_id: Some(b_id),
            max_discount: Decimal::ZERO,
        };
        let b = ProductCategory {
            id: b_id,
            name: "b".to_string(),
            parent_id: Some(a_id),
            max_discount: Decimal::ZERO,
        };
        let catalog = InMemoryCatalog::new().with_category(a).with_category(b);

        match catalog.max_discount_chain(a_id) {
            Err(DomainError::Configuration(msg)) if msg.contains("cycle") => {}
            other => panic!("Expected cycle Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn hidden_discounts_are_folded_into_the_price() {
        let list = PriceList {
            id: PriceListId::new(),
            name: "Resellers".to_string(),
            hide_discount: true,
            lines: Vec::new(),
        };
        let list_id = list.id;
        let catalog = InMemoryCatalog::new().with_price_list(list);
        let line = PriceListLine {
            product_id: Some(ProductId::new()),
            category_id: None,
            min_qty: Decimal::ZERO,
            adjustment: PriceListAdjustment::Discount(Discount::percent(dec!(10))),
        };

        let resolution = catalog.discount_and_replacement_price(list_id, &line, dec!(20), 2);
        assert_eq!(resolution.price, dec!(18.00));
        assert!(resolution.discount.is_none());

        let hidden = PriceListLine {
            adjustment: PriceListAdjustment::Discount(Discount::percent(dec!(15))),
            ..line
        };
        let resolution = catalog.discount_and_replacement_price(list_id, &hidden, dec!(9.99), 4);
        assert_eq!(resolution.price, dec!(8.4915));
    }
}
