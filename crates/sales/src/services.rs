//! Collaborators the computation core consumes.
//!
//! These are black-box services (currency rates, tax determination, pricing
//! configuration, catalog lookups). The core only depends on the traits; the
//! [`crate::in_memory`] module provides a self-contained implementation.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use tradedoc_catalog::{
    Discount, FiscalPosition, PackTemplate, PriceListLine, PricingEffect, PricingRule, Product,
    ProductCategory, TaxEquivalence, TaxRate,
};
use tradedoc_core::{
    CategoryId, CurrencyCode, DomainError, DomainResult, PackId, PartnerId, PriceListId, ProductId,
};
use tradedoc_parties::Company;

use crate::order::OrderLine;

/// Product and pack lookups.
pub trait ProductCatalog {
    fn product(&self, id: ProductId) -> Option<&Product>;

    fn pack(&self, id: PackId) -> Option<&PackTemplate>;

    fn require_product(&self, id: ProductId) -> DomainResult<&Product> {
        self.product(id)
            .ok_or_else(|| DomainError::configuration(format!("unknown product {id}")))
    }
}

pub trait CurrencyConverter {
    /// Convert `amount` from one currency to another at the rate valid on `as_of`.
    fn convert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
        as_of: NaiveDate,
    ) -> DomainResult<Decimal>;
}

pub trait TaxRateResolver {
    /// Effective sale tax for `product`, after fiscal-position substitution.
    fn tax_line_for(
        &self,
        date: NaiveDate,
        product: &Product,
        company: &Company,
        fiscal_position: Option<&FiscalPosition>,
    ) -> DomainResult<TaxRate>;

    /// Substitution applied to `product`'s tax under `fiscal_position`, if any.
    fn tax_equivalence_for(
        &self,
        product: &Product,
        company: &Company,
        fiscal_position: Option<&FiscalPosition>,
    ) -> Option<TaxEquivalence>;
}

/// Context a pricing rule is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingContext {
    pub date: NaiveDate,
    pub client_id: Option<PartnerId>,
    pub quantity: Option<Decimal>,
}

pub trait PricingRuleEngine {
    /// The root rule matching this product. Only one root rule is expected to
    /// match; when several do, the first found wins.
    fn match_root_rule(
        &self,
        company: &Company,
        product: &Product,
        category_id: Option<CategoryId>,
        context: &PricingContext,
    ) -> Option<PricingRule>;

    /// Effect of applying `rule` to `line`.
    fn apply(&self, rule: &PricingRule, line: &OrderLine) -> PricingEffect;
}

/// Unit price and discount resulting from a matching price-list line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceListResolution {
    pub price: Decimal,
    pub discount: Discount,
}

pub trait PriceListService {
    fn line_for(
        &self,
        product: &Product,
        quantity: Decimal,
        price_list: PriceListId,
        price: Decimal,
    ) -> Option<PriceListLine>;

    /// Apply `line` to `price`. A discount folded into the price is rounded to
    /// `unit_price_scale`.
    fn discount_and_replacement_price(
        &self,
        price_list: PriceListId,
        line: &PriceListLine,
        price: Decimal,
        unit_price_scale: u32,
    ) -> PriceListResolution;
}

pub trait CategoryMaxDiscountLookup {
    fn category(&self, id: CategoryId) -> Option<&ProductCategory>;

    /// Walk the category tree upward until a non-zero maximum discount is found.
    ///
    /// Returns zero when no ancestor defines one. A chain that revisits a category
    /// is a configuration error.
    fn max_discount_chain(&self, id: CategoryId) -> DomainResult<Decimal> {
        let mut visited = HashSet::new();
        let mut current = Some(id);

        while let Some(category_id) = current {
            if !visited.insert(category_id) {
                return Err(DomainError::configuration(format!(
                    "product category cycle detected at {category_id}"
                )));
            }
            let Some(category) = self.category(category_id) else {
                return Err(DomainError::configuration(format!(
                    "unknown product category {category_id}"
                )));
            };
            if !category.max_discount.is_zero() {
                return Ok(category.max_discount);
            }
            current = category.parent_id;
        }

        Ok(Decimal::ZERO)
    }
}

/// Bundle of collaborator handles passed to the computation components.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub catalog: &'a dyn ProductCatalog,
    pub currency: &'a dyn CurrencyConverter,
    pub taxes: &'a dyn TaxRateResolver,
    pub pricing_rules: &'a dyn PricingRuleEngine,
    pub price_lists: &'a dyn PriceListService,
    pub categories: &'a dyn CategoryMaxDiscountLookup,
}

impl<'a> Collaborators<'a> {
    /// Use one value implementing every collaborator trait for all of them.
    pub fn from_single<T>(services: &'a T) -> Self
    where
        T: ProductCatalog
            + CurrencyConverter
            + TaxRateResolver
            + PricingRuleEngine
            + PriceListService
            + CategoryMaxDiscountLookup,
    {
        Self {
            catalog: services,
            currency: services,
            taxes: services,
            pricing_rules: services,
            price_lists: services,
            categories: services,
        }
    }
}
