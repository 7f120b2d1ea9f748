//! Product-driven line information: unit, price, discount and tax snapshots.

use rust_decimal::Decimal;

use tradedoc_catalog::{Discount, Product};
use tradedoc_core::{DomainError, DomainResult, LineId, RoundingMode, round};
use tradedoc_parties::Company;

use crate::config::{Feature, SalesConfig};
use crate::line::values::{order_currencies, tax_fraction};
use crate::order::{OrderLine, SalesOrder};
use crate::price::{convert_unit_price, discount_as_percent};
use crate::services::{Collaborators, PricingContext};

/// Unit prices resolved for a line, in the order currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UnitPrices {
    price: Decimal,
    in_tax_price: Decimal,
}

impl UnitPrices {
    /// Build both forms from one price expressed tax-inclusive (`ati`) or not.
    fn from_price(value: Decimal, ati: bool, tax_fraction: Decimal, scale: u32) -> Self {
        if ati {
            Self {
                price: convert_unit_price(value, tax_fraction, false, scale),
                in_tax_price: value,
            }
        } else {
            Self {
                price: value,
                in_tax_price: convert_unit_price(value, tax_fraction, true, scale),
            }
        }
    }

    fn for_order(&self, in_ati: bool) -> Decimal {
        if in_ati { self.in_tax_price } else { self.price }
    }
}

/// Fills a line's unit, price, discount and tax information from its product.
pub struct LineInformationResolver<'a> {
    services: Collaborators<'a>,
    config: &'a SalesConfig,
}

impl<'a> LineInformationResolver<'a> {
    pub fn new(services: Collaborators<'a>, config: &'a SalesConfig) -> Self {
        Self { services, config }
    }

    /// Resolve `line` against `order`.
    ///
    /// Lines without a product are left untouched. Tax and cost snapshots are always
    /// refreshed; unit, price and discount are kept as entered when the line has
    /// `enable_freeze_fields`.
    pub fn resolve(&self, order: &SalesOrder, line: &mut OrderLine) -> DomainResult<()> {
        let Some(product_id) = line.product_id else {
            return Ok(());
        };
        let product = self.services.catalog.require_product(product_id)?;
        let company = order.company.as_ref().ok_or_else(|| {
            DomainError::configuration(format!("order {} has no company", order.id))
        })?;

        let tax = self.services.taxes.tax_line_for(
            order.creation_date,
            product,
            company,
            order.fiscal_position.as_ref(),
        )?;
        line.tax_equivalence =
            self.services
                .taxes
                .tax_equivalence_for(product, company, order.fiscal_position.as_ref());
        let rate = tax.fraction();
        line.tax_rate = Some(tax);
        line.company_cost_price = product.cost_price;
        if line.product_name.is_empty() {
            line.product_name = product.name.clone();
        }

        if line.enable_freeze_fields {
            tracing::debug!(
                line_id = %line.id,
                product = %product.code,
                "frozen line: tax and cost refreshed only"
            );
            return Ok(());
        }

        line.unit = product.selling_unit().cloned();

        let catalog_price = self.catalog_price(order, product, rate)?;
        let (prices, discount) = self.apply_pricing(order, company, product, line, catalog_price);

        line.price = Some(prices.price);
        line.in_tax_price = Some(prices.in_tax_price);
        line.set_discount(discount);

        tracing::debug!(
            line_id = %line.id,
            product = %product.code,
            price = %prices.price,
            in_tax_price = %prices.in_tax_price,
            "line information resolved"
        );
        Ok(())
    }

    /// Resolve the line `id` in place.
    pub fn resolve_line(&self, order: &mut SalesOrder, id: LineId) -> DomainResult<()> {
        let mut line = order
            .line(id)
            .cloned()
            .ok_or_else(|| DomainError::validation(format!("unknown order line {id}")))?;
        self.resolve(order, &mut line)?;
        if let Some(slot) = order.line_mut(id) {
            *slot = line;
        }
        Ok(())
    }

    /// Catalog sale price converted into the order currency, in both tax forms.
    fn catalog_price(
        &self,
        order: &SalesOrder,
        product: &Product,
        tax_fraction: Decimal,
    ) -> DomainResult<UnitPrices> {
        let (currency, _) = order_currencies(order)?;
        let scale = self.config.unit_price_scale;

        let converted = self.services.currency.convert(
            &product.sale_currency,
            currency,
            product.sale_price,
            order.creation_date,
        )?;
        let converted = round(converted, scale, RoundingMode::HalfUp);

        Ok(UnitPrices::from_price(converted, product.in_ati, tax_fraction, scale))
    }

    /// Pricing rules, then price list. Returns the final prices and discount.
    fn apply_pricing(
        &self,
        order: &SalesOrder,
        company: &Company,
        product: &Product,
        line: &OrderLine,
        mut prices: UnitPrices,
    ) -> (UnitPrices, Discount) {
        let scale = self.config.unit_price_scale;
        let rate = tax_fraction(line.tax_rate.as_ref());
        let mut discount = Discount::NONE;

        if self.config.features.enabled(Feature::PricingRules) {
            let context = PricingContext {
                date: order.creation_date,
                client_id: order.client.as_ref().map(|client| client.id),
                quantity: line.quantity,
            };
            if let Some(rule) = self.services.pricing_rules.match_root_rule(
                company,
                product,
                product.category_id,
                &context,
            ) {
                let effect = self.services.pricing_rules.apply(&rule, line);
                if let Some(unit_price) = effect.unit_price {
                    prices = UnitPrices::from_price(unit_price, false, rate, scale);
                }
                if let Some(rule_discount) = effect.discount {
                    discount = rule_discount;
                }
                tracing::debug!(line_id = %line.id, rule = %rule.name, "pricing rule applied");
            }
        }

        let Some(price_list) = order.price_list_id else {
            return (prices, discount);
        };
        let base = prices.for_order(order.in_ati);
        let quantity = line.quantity.unwrap_or_default();
        let Some(list_line) = self
            .services
            .price_lists
            .line_for(product, quantity, price_list, base)
        else {
            return (prices, discount);
        };

        let resolution = self
            .services
            .price_lists
            .discount_and_replacement_price(price_list, &list_line, base, scale);
        prices = UnitPrices::from_price(resolution.price, order.in_ati, rate, scale);
        discount = resolution.discount;

        let manual = line.discount();
        if order.template
            && discount_as_percent(manual, resolution.price)
                > discount_as_percent(discount, resolution.price)
        {
            discount = manual;
        }

        (prices, discount)
    }
}
