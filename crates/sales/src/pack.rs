//! Pack expansion: bundle templates become concrete order lines.

use std::collections::HashSet;

use rust_decimal::Decimal;

use tradedoc_catalog::{LineType, PackLineTemplate, PackTemplate};
use tradedoc_core::{DomainError, DomainResult, LineId, PackId, RoundingMode, round};

use crate::config::SalesConfig;
use crate::line::values::{order_currencies, tax_fraction};
use crate::line::{LineInformationResolver, LineValueComputer};
use crate::margin::MarginCalculator;
use crate::order::{OrderLine, SalesOrder};
use crate::price::convert_unit_price;
use crate::services::Collaborators;

pub struct PackExpander<'a> {
    services: Collaborators<'a>,
    config: &'a SalesConfig,
}

impl<'a> PackExpander<'a> {
    pub fn new(services: Collaborators<'a>, config: &'a SalesConfig) -> Self {
        Self { services, config }
    }

    /// Expand `template` into order lines, `multiplier` packs deep.
    ///
    /// Lines are sequenced contiguously after the order's last line. Unless the
    /// template suppresses them or already carries its own markers, START_OF_PACK and
    /// END_OF_PACK lines bracket the components. Every produced line carries the same
    /// `parent_id` correlation key: the id of the start line. A template carrying
    /// more than one START_OF_PACK marker is a configuration error.
    pub fn expand(
        &self,
        template: &PackTemplate,
        order: &SalesOrder,
        multiplier: Decimal,
    ) -> DomainResult<Vec<OrderLine>> {
        let start_markers = template
            .lines
            .iter()
            .filter(|line| line.line_type == LineType::StartOfPack)
            .count();
        if start_markers > 1 {
            return Err(DomainError::configuration(format!(
                "pack {} has {start_markers} start-of-pack lines",
                template.name
            )));
        }
        let brackets =
            !template.do_not_display_header_and_end_pack && !template.has_bracket_markers();
        let parent_id = LineId::new();
        let mut sequence = order.max_sequence();
        let mut lines = Vec::with_capacity(template.lines.len() + 2);

        if brackets {
            sequence += 1;
            lines.push(self.start_line(template, parent_id, sequence, multiplier));
        }

        for component in template.sorted_lines() {
            sequence += 1;
            let mut line = match component.line_type {
                LineType::StartOfPack => {
                    self.start_line(template, parent_id, sequence, multiplier)
                }
                LineType::EndOfPack => self.end_line(template, parent_id, sequence),
                LineType::Title => OrderLine::title(component.product_name.clone()),
                LineType::Normal => self.component_line(template, component, order, multiplier)?,
            };
            line.sequence = sequence;
            line.pack_id = Some(template.id);
            if line.id != parent_id {
                line.parent_id = Some(parent_id);
            }
            lines.push(line);
        }

        if brackets {
            sequence += 1;
            lines.push(self.end_line(template, parent_id, sequence));
        }

        tracing::info!(
            pack = %template.name,
            order_id = %order.id,
            multiplier = %multiplier,
            lines = lines.len(),
            brackets,
            "pack expanded"
        );
        Ok(lines)
    }

    /// Expand the catalog pack `pack_id` and append its lines to `order`.
    pub fn insert_pack(
        &self,
        order: &mut SalesOrder,
        pack_id: PackId,
        multiplier: Decimal,
    ) -> DomainResult<Vec<LineId>> {
        let template = self
            .services
            .catalog
            .pack(pack_id)
            .ok_or_else(|| DomainError::configuration(format!("unknown pack {pack_id}")))?;
        let lines = self.expand(template, order, multiplier)?;
        let ids = lines.iter().map(|line| line.id).collect();
        order.insert_lines(lines);
        Ok(ids)
    }

    /// Propagate a quantity change of a START_OF_PACK line to the pack's lines.
    ///
    /// Each member quantity becomes `round(qty × new / old, quantity_scale, HALF_EVEN)`
    /// and its values are recomputed. Members are the lines correlated to the start
    /// line, plus the lines between it and the next END_OF_PACK.
    pub fn update_pack_quantity(
        &self,
        order: &mut SalesOrder,
        start_id: LineId,
        new_quantity: Decimal,
    ) -> DomainResult<()> {
        let start = order
            .line(start_id)
            .ok_or_else(|| DomainError::validation(format!("unknown order line {start_id}")))?;
        if start.line_type != LineType::StartOfPack {
            return Err(DomainError::validation(format!(
                "order line {start_id} is not a start-of-pack line"
            )));
        }
        let old_quantity = start.quantity.unwrap_or_default();
        if old_quantity.is_zero() {
            return Err(DomainError::validation(
                "cannot rescale a pack whose quantity is zero",
            ));
        }

        let members = pack_members(order, start_id);
        let values = LineValueComputer::new(self.services.currency, self.config);
        let margins = MarginCalculator::new(self.config.consider_zero_cost);

        for id in &members {
            let Some(mut line) = order.line(*id).cloned() else {
                continue;
            };
            if !line.is_normal() {
                continue;
            }
            if let Some(quantity) = line.quantity {
                line.quantity = Some(round(
                    quantity * new_quantity / old_quantity,
                    self.config.quantity_scale,
                    RoundingMode::HalfEven,
                ));
            }
            values.compute_into(order, &mut line)?;
            margins.compute_line_margin(&mut line);
            if let Some(slot) = order.line_mut(*id) {
                *slot = line;
            }
        }

        if let Some(start) = order.line_mut(start_id) {
            start.quantity = Some(new_quantity);
        }
        tracing::info!(
            order_id = %order.id,
            start_line = %start_id,
            old = %old_quantity,
            new = %new_quantity,
            members = members.len(),
            "pack quantity updated"
        );
        Ok(())
    }

    fn start_line(
        &self,
        template: &PackTemplate,
        id: LineId,
        sequence: u32,
        multiplier: Decimal,
    ) -> OrderLine {
        OrderLine {
            id,
            sequence,
            line_type: LineType::StartOfPack,
            product_name: template.name.clone(),
            quantity: Some(multiplier),
            pack_id: Some(template.id),
            ..OrderLine::default()
        }
    }

    fn end_line(&self, template: &PackTemplate, parent_id: LineId, sequence: u32) -> OrderLine {
        OrderLine {
            id: LineId::new(),
            sequence,
            line_type: LineType::EndOfPack,
            product_name: self.config.end_of_pack_label.clone(),
            quantity: Some(Decimal::ZERO),
            is_show_total: template.is_show_total,
            is_hide_unit_amounts: template.is_hide_unit_amounts,
            parent_id: Some(parent_id),
            pack_id: Some(template.id),
            ..OrderLine::default()
        }
    }

    fn component_line(
        &self,
        template: &PackTemplate,
        component: &PackLineTemplate,
        order: &SalesOrder,
        multiplier: Decimal,
    ) -> DomainResult<OrderLine> {
        let quantity = round(
            component.quantity * multiplier,
            self.config.quantity_scale,
            RoundingMode::HalfUp,
        );
        let mut line = OrderLine {
            id: LineId::new(),
            product_id: component.product_id,
            product_name: component.product_name.clone(),
            quantity: Some(quantity),
            ..OrderLine::default()
        };
        if line.product_id.is_none() {
            return Ok(line);
        }

        LineInformationResolver::new(self.services, self.config).resolve(order, &mut line)?;

        if let Some(price) = component.price {
            let (currency, _) = order_currencies(order)?;
            let scale = self.config.unit_price_scale;
            let converted = self.services.currency.convert(
                &template.currency,
                currency,
                price,
                order.creation_date,
            )?;
            let converted = round(converted, scale, RoundingMode::HalfUp);
            line.price = Some(converted);
            line.in_tax_price = Some(convert_unit_price(
                converted,
                tax_fraction(line.tax_rate.as_ref()),
                true,
                scale,
            ));
        }

        LineValueComputer::new(self.services.currency, self.config).compute_into(order, &mut line)?;
        MarginCalculator::new(self.config.consider_zero_cost).compute_line_margin(&mut line);
        Ok(line)
    }
}

/// Lines correlated to `start_id`, plus those positioned between it and the next
/// END_OF_PACK. Order of appearance is kept.
fn pack_members(order: &SalesOrder, start_id: LineId) -> Vec<LineId> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();

    for line in order.pack_lines(start_id) {
        if seen.insert(line.id) {
            members.push(line.id);
        }
    }

    let after_start = order
        .lines()
        .iter()
        .skip_while(|line| line.id != start_id)
        .skip(1);
    for line in after_start {
        if line.line_type.is_pack_bracket() {
            break;
        }
        if seen.insert(line.id) {
            members.push(line.id);
        }
    }

    members
}
