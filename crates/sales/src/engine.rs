//! Component wiring over one set of collaborators and settings.

use tradedoc_core::{DomainError, DomainResult, LineId};

use crate::compute::OrderComputer;
use crate::config::SalesConfig;
use crate::discount_guard::DiscountGuard;
use crate::line::{LineInformationResolver, LineValueComputer};
use crate::margin::MarginCalculator;
use crate::merge::MergeReconciler;
use crate::order::SalesOrder;
use crate::pack::PackExpander;
use crate::services::Collaborators;

#[derive(Clone, Copy)]
pub struct SalesEngine<'a> {
    services: Collaborators<'a>,
    config: &'a SalesConfig,
}

impl<'a> SalesEngine<'a> {
    pub fn new(services: Collaborators<'a>, config: &'a SalesConfig) -> Self {
        Self { services, config }
    }

    pub fn config(&self) -> &'a SalesConfig {
        self.config
    }

    pub fn resolver(&self) -> LineInformationResolver<'a> {
        LineInformationResolver::new(self.services, self.config)
    }

    pub fn line_values(&self) -> LineValueComputer<'a> {
        LineValueComputer::new(self.services.currency, self.config)
    }

    pub fn margins(&self) -> MarginCalculator {
        MarginCalculator::new(self.config.consider_zero_cost)
    }

    pub fn order_computer(&self) -> OrderComputer<'a> {
        OrderComputer::new(self.services.currency, &self.config.features)
    }

    pub fn packs(&self) -> PackExpander<'a> {
        PackExpander::new(self.services, self.config)
    }

    pub fn discount_guard(&self) -> DiscountGuard<'a> {
        DiscountGuard::new(self.services.catalog, self.services.categories)
    }

    pub fn merger(&self) -> MergeReconciler<'a> {
        MergeReconciler::new(self.services.currency, self.config)
    }

    /// A line changed: resolve it from its product, recompute its values and
    /// margin, then recompute the whole order.
    pub fn refresh_line(&self, order: &mut SalesOrder, id: LineId) -> DomainResult<()> {
        self.resolver().resolve_line(order, id)?;

        let mut line = order
            .line(id)
            .cloned()
            .ok_or_else(|| DomainError::validation(format!("unknown order line {id}")))?;
        self.line_values().compute_into(order, &mut line)?;
        self.margins().compute_line_margin(&mut line);
        if let Some(slot) = order.line_mut(id) {
            *slot = line;
        }

        self.recompute_order(order)
    }

    /// Recompute every line's values from its current price and quantity, then the
    /// order totals and margins. Prices are not re-resolved.
    pub fn recompute(&self, order: &mut SalesOrder) -> DomainResult<()> {
        let values = self.line_values();
        let mut lines = order.lines().to_vec();
        for line in lines.iter_mut().filter(|line| line.is_normal()) {
            values.compute_into(order, line)?;
        }
        for line in lines {
            if let Some(slot) = order.line_mut(line.id) {
                *slot = line;
            }
        }
        self.recompute_order(order)
    }

    fn recompute_order(&self, order: &mut SalesOrder) -> DomainResult<()> {
        self.order_computer().compute_order(order)?;
        self.margins().compute_all(order);
        Ok(())
    }
}
