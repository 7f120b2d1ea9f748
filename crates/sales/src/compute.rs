//! Order recompute pipeline and pack subtotal bracketing.
//!
//! `OrderComputer` runs a fixed base pipeline followed by the extensions selected
//! from the [`FeatureSet`] at construction time.

use rust_decimal::Decimal;

use tradedoc_catalog::LineType;
use tradedoc_core::DomainResult;

use crate::config::{Feature, FeatureSet};
use crate::line::values::to_company_currency;
use crate::order::{AdvancePaymentStatus, SalesOrder};
use crate::services::CurrencyConverter;
use crate::tax::TaxAggregator;

/// Optional step run after the base totals are known.
pub trait ComputeExtension: Send + Sync {
    fn feature(&self) -> Feature;

    fn apply(&self, order: &mut SalesOrder) -> DomainResult<()>;
}

/// Sum of the order's non-canceled advance payments.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancePaymentTotals;

impl ComputeExtension for AdvancePaymentTotals {
    fn feature(&self) -> Feature {
        Feature::AdvancePayments
    }

    fn apply(&self, order: &mut SalesOrder) -> DomainResult<()> {
        order.totals.advance_total = order
            .advance_payments
            .iter()
            .filter(|payment| payment.status != AdvancePaymentStatus::Canceled)
            .map(|payment| payment.amount)
            .sum();
        Ok(())
    }
}

/// Amount of the tax-inclusive total not yet covered by the invoicing timetable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimetableSpread;

impl ComputeExtension for TimetableSpread {
    fn feature(&self) -> Feature {
        Feature::Timetables
    }

    fn apply(&self, order: &mut SalesOrder) -> DomainResult<()> {
        let scheduled: Decimal = order.timetables.iter().map(|t| t.amount).sum();
        order.totals.amount_to_be_spread = order.totals.in_tax_total - scheduled;
        Ok(())
    }
}

/// Full, from-scratch recompute of an order's derived fields.
pub struct OrderComputer<'a> {
    currency: &'a dyn CurrencyConverter,
    taxes: TaxAggregator,
    extensions: Vec<Box<dyn ComputeExtension>>,
}

impl<'a> OrderComputer<'a> {
    pub fn new(currency: &'a dyn CurrencyConverter, features: &FeatureSet) -> Self {
        let mut extensions: Vec<Box<dyn ComputeExtension>> = Vec::new();
        if features.enabled(Feature::AdvancePayments) {
            extensions.push(Box::new(AdvancePaymentTotals));
        }
        if features.enabled(Feature::Timetables) {
            extensions.push(Box::new(TimetableSpread));
        }
        Self {
            currency,
            taxes: TaxAggregator::new(),
            extensions,
        }
    }

    /// Recompute tax lines and totals. Idempotent: only derived fields change.
    pub fn compute_order(&self, order: &mut SalesOrder) -> DomainResult<()> {
        order.sort_lines();
        order.tax_lines_mut().clear();

        let mut company_totals = Vec::with_capacity(order.lines().len());
        for line in order.lines() {
            company_totals.push(to_company_currency(self.currency, order, line.ex_tax_total)?);
        }
        for (line, company_ex) in order.lines_mut().iter_mut().zip(company_totals) {
            line.company_ex_tax_total = company_ex;
        }

        let tax_lines = self.taxes.aggregate(order);
        order.tax_lines_mut().extend(tax_lines);

        let mut ex_tax_total = Decimal::ZERO;
        let mut company_ex_tax_total = Decimal::ZERO;
        for line in order.lines().iter().filter(|line| line.is_normal()) {
            ex_tax_total += line.ex_tax_total;
            company_ex_tax_total += line.company_ex_tax_total;
        }
        let tax_total: Decimal = order.tax_lines().iter().map(|t| t.tax_total).sum();

        order.totals = Default::default();
        order.totals.ex_tax_total = ex_tax_total;
        order.totals.company_ex_tax_total = company_ex_tax_total;
        order.totals.tax_total = tax_total;
        order.totals.in_tax_total = ex_tax_total + tax_total;

        for extension in &self.extensions {
            extension.apply(order)?;
        }

        tracing::info!(
            order_id = %order.id,
            lines = order.lines().len(),
            ex_tax_total = %order.totals.ex_tax_total,
            tax_total = %order.totals.tax_total,
            in_tax_total = %order.totals.in_tax_total,
            extensions = ?self.extensions.iter().map(|e| e.feature().as_str()).collect::<Vec<_>>(),
            "order computed"
        );
        Ok(())
    }
}

/// Write running pack subtotals into END_OF_PACK lines.
///
/// Totals accumulate over NORMAL lines and restart at every START_OF_PACK and after
/// every END_OF_PACK. End lines get a zero quantity; their totals stay zero unless
/// `is_show_total` is set.
pub fn compute_pack_total(order: &mut SalesOrder) {
    order.sort_lines();

    let mut ex_total = Decimal::ZERO;
    let mut in_total = Decimal::ZERO;
    for line in order.lines_mut() {
        match line.line_type {
            LineType::Normal => {
                ex_total += line.ex_tax_total;
                in_total += line.in_tax_total;
            }
            LineType::StartOfPack => {
                ex_total = Decimal::ZERO;
                in_total = Decimal::ZERO;
            }
            LineType::EndOfPack => {
                if line.is_show_total {
                    line.ex_tax_total = ex_total;
                    line.in_tax_total = in_total;
                } else {
                    line.ex_tax_total = Decimal::ZERO;
                    line.in_tax_total = Decimal::ZERO;
                }
                line.quantity = Some(Decimal::ZERO);
                ex_total = Decimal::ZERO;
                in_total = Decimal::ZERO;
            }
            LineType::Title => {}
        }
    }
}

/// Clear END_OF_PACK display flags and totals.
pub fn reset_pack_total(order: &mut SalesOrder) {
    for line in order
        .lines_mut()
        .iter_mut()
        .filter(|line| line.line_type == LineType::EndOfPack)
    {
        line.is_show_total = false;
        line.is_hide_unit_amounts = false;
        line.ex_tax_total = Decimal::ZERO;
        line.in_tax_total = Decimal::ZERO;
    }
}
