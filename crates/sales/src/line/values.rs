//! Monetary totals of a single order line.

use rust_decimal::Decimal;

use tradedoc_catalog::TaxRate;
use tradedoc_core::{
    CurrencyCode, DEFAULT_SCALE, DomainError, DomainResult, RoundingMode, compute_amount, round,
};

use crate::config::SalesConfig;
use crate::order::{OrderLine, SalesOrder};
use crate::price::compute_discount;
use crate::services::CurrencyConverter;

/// Totals derived from a line's resolved price, quantity and tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineValues {
    pub ex_tax_total: Decimal,
    pub in_tax_total: Decimal,
    pub company_ex_tax_total: Decimal,
    pub company_in_tax_total: Decimal,
    pub price_discounted: Decimal,
    pub sub_total_cost_price: Decimal,
}

impl LineValues {
    pub fn apply_to(&self, line: &mut OrderLine) {
        line.ex_tax_total = self.ex_tax_total;
        line.in_tax_total = self.in_tax_total;
        line.company_ex_tax_total = self.company_ex_tax_total;
        line.company_in_tax_total = self.company_in_tax_total;
        line.price_discounted = self.price_discounted;
        line.sub_total_cost_price = self.sub_total_cost_price;
    }
}

/// Computes [`LineValues`] for one line of an order.
pub struct LineValueComputer<'a> {
    currency: &'a dyn CurrencyConverter,
    config: &'a SalesConfig,
}

impl<'a> LineValueComputer<'a> {
    pub fn new(currency: &'a dyn CurrencyConverter, config: &'a SalesConfig) -> Self {
        Self { currency, config }
    }

    /// Compute the line's totals.
    ///
    /// Returns `Ok(None)` when the quantity, price or tax-inclusive price is not set
    /// yet: the line is not computable, which is not an error.
    pub fn compute(
        &self,
        order: &SalesOrder,
        line: &OrderLine,
    ) -> DomainResult<Option<LineValues>> {
        let (Some(quantity), Some(price), Some(in_tax_price)) =
            (line.quantity, line.price, line.in_tax_price)
        else {
            tracing::debug!(line_id = %line.id, "line not computable yet");
            return Ok(None);
        };

        let rate = tax_fraction(line.tax_rate.as_ref());
        let discount = line.discount();
        let scale = self.config.unit_price_scale;

        let (price_discounted, ex_tax_total, in_tax_total) = if order.in_ati {
            let discounted = compute_discount(in_tax_price, discount, scale);
            let in_tax_total = compute_amount(quantity, discounted);
            let ex_tax_total = round(
                in_tax_total / (Decimal::ONE + rate),
                DEFAULT_SCALE,
                RoundingMode::HalfUp,
            );
            (discounted, ex_tax_total, in_tax_total)
        } else {
            let discounted = compute_discount(price, discount, scale);
            let ex_tax_total = compute_amount(quantity, discounted);
            let in_tax_total = round(
                ex_tax_total + ex_tax_total * rate,
                DEFAULT_SCALE,
                RoundingMode::HalfUp,
            );
            (discounted, ex_tax_total, in_tax_total)
        };

        let company_ex_tax_total = self.company_amount(order, ex_tax_total)?;
        let company_in_tax_total = round(
            company_ex_tax_total + company_ex_tax_total * rate,
            DEFAULT_SCALE,
            RoundingMode::HalfUp,
        );

        let sub_total_cost_price = if line.company_cost_price.is_zero() {
            Decimal::ZERO
        } else {
            compute_amount(quantity, line.company_cost_price)
        };

        let values = LineValues {
            ex_tax_total,
            in_tax_total,
            company_ex_tax_total,
            company_in_tax_total,
            price_discounted,
            sub_total_cost_price,
        };
        tracing::debug!(
            line_id = %line.id,
            ex_tax_total = %values.ex_tax_total,
            in_tax_total = %values.in_tax_total,
            "line values computed"
        );
        Ok(Some(values))
    }

    /// Compute and store the totals on `line`. Returns whether the line was computable.
    pub fn compute_into(&self, order: &SalesOrder, line: &mut OrderLine) -> DomainResult<bool> {
        match self.compute(order, line)? {
            Some(values) => {
                values.apply_to(line);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Convert an order-currency amount into the company currency, rounded to cents.
    pub fn company_amount(&self, order: &SalesOrder, amount: Decimal) -> DomainResult<Decimal> {
        to_company_currency(self.currency, order, amount)
    }
}

pub(crate) fn tax_fraction(tax: Option<&TaxRate>) -> Decimal {
    tax.map(TaxRate::fraction).unwrap_or(Decimal::ZERO)
}

pub(crate) fn order_currencies(order: &SalesOrder) -> DomainResult<(&CurrencyCode, &CurrencyCode)> {
    let currency = order
        .currency
        .as_ref()
        .ok_or_else(|| DomainError::configuration(format!("order {} has no currency", order.id)))?;
    let company_currency = order
        .company_currency()
        .ok_or_else(|| DomainError::configuration(format!("order {} has no company", order.id)))?;
    Ok((currency, company_currency))
}

pub(crate) fn to_company_currency(
    converter: &dyn CurrencyConverter,
    order: &SalesOrder,
    amount: Decimal,
) -> DomainResult<Decimal> {
    let (currency, company_currency) = order_currencies(order)?;
    let converted = converter.convert(currency, company_currency, amount, order.creation_date)?;
    Ok(round(converted, DEFAULT_SCALE, RoundingMode::HalfUp))
}
