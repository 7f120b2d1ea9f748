//! Per-rate tax aggregation and tax-equivalence notes.

use rust_decimal::Decimal;

use tradedoc_core::{DEFAULT_SCALE, RoundingMode, TaxRateId, round};

use crate::order::{OrderLine, OrderTaxLine, SalesOrder};

/// Groups NORMAL lines by tax-rate record and builds one [`OrderTaxLine`] per rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxAggregator;

impl TaxAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Build the order's tax lines and set its specific notes.
    ///
    /// Lines are grouped by rate identity, not by numeric value. Entries come out in
    /// order of first appearance.
    pub fn aggregate(&self, order: &mut SalesOrder) -> Vec<OrderTaxLine> {
        let tax_lines = self.tax_lines(order.lines());
        order.specific_notes = self.specific_notes(order);
        tax_lines
    }

    pub fn tax_lines(&self, lines: &[OrderLine]) -> Vec<OrderTaxLine> {
        let mut groups: Vec<(TaxRateId, OrderTaxLine)> = Vec::new();

        for line in lines.iter().filter(|line| line.is_normal()) {
            let Some(tax) = line.tax_rate.as_ref() else {
                continue;
            };
            match groups.iter_mut().find(|(id, _)| *id == tax.id) {
                Some((_, group)) => group.ex_tax_base += line.ex_tax_total,
                None => groups.push((
                    tax.id,
                    OrderTaxLine {
                        tax: tax.clone(),
                        ex_tax_base: line.ex_tax_total,
                        tax_total: Decimal::ZERO,
                        in_tax_total: Decimal::ZERO,
                    },
                )),
            }
        }

        groups
            .into_iter()
            .map(|(_, mut group)| {
                group.tax_total = round(
                    group.ex_tax_base * group.tax.rate / Decimal::ONE_HUNDRED,
                    DEFAULT_SCALE,
                    RoundingMode::HalfUp,
                );
                group.in_tax_total = group.ex_tax_base + group.tax_total;
                group
            })
            .collect()
    }

    /// Notes printed on the document for the tax treatment in use.
    ///
    /// The client's own note when the fiscal position asks for it, otherwise the
    /// distinct equivalence notes of every line (any type), newline-joined.
    pub fn specific_notes(&self, order: &SalesOrder) -> Option<String> {
        let customer_specific = order
            .fiscal_position
            .as_ref()
            .is_some_and(|fp| fp.customer_specific_note);
        if customer_specific {
            return order
                .client
                .as_ref()
                .and_then(|client| client.specific_tax_note.clone());
        }

        let mut notes: Vec<&str> = Vec::new();
        for line in order.lines() {
            let Some(note) = line
                .tax_equivalence
                .as_ref()
                .and_then(|eq| eq.specific_note.as_deref())
            else {
                continue;
            };
            if !note.is_empty() && !notes.contains(&note) {
                notes.push(note);
            }
        }

        if notes.is_empty() {
            None
        } else {
            Some(notes.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{order, priced_line, tax};
    use rust_decimal_macros::dec;
    use tradedoc_catalog::{FiscalPosition, LineType, TaxEquivalence};
    use tradedoc_core::{FiscalPositionId, TaxEquivalenceId};
    use tradedoc_parties::Partner;

    fn with_totals(mut line: OrderLine, ex: Decimal) -> OrderLine {
        line.ex_tax_total = ex;
        line
    }

    fn equivalence(note: &str) -> TaxEquivalence {
        TaxEquivalence {
            id: TaxEquivalenceId::new(),
            from_tax_id: TaxRateId::new(),
            to_tax_id: TaxRateId::new(),
            specific_note: Some(note.to_string()),
        }
    }

    #[test]
    fn groups_by_rate_record_not_numeric_value() {
        let vat_a = tax(dec!(20));
        let vat_b = tax(dec!(20));
        let lines = vec![
            with_totals(priced_line(dec!(1), dec!(10), &vat_a), dec!(10.00)),
            with_totals(priced_line(dec!(1), dec!(5), &vat_b), dec!(5.00)),
            with_totals(priced_line(dec!(1), dec!(2.5), &vat_a), dec!(2.55)),
        ];

        let tax_lines = TaxAggregator::new().tax_lines(&lines);

        assert_eq!(tax_lines.len(), 2);
        assert_eq!(tax_lines[0].tax.id, vat_a.id);
        assert_eq!(tax_lines[0].ex_tax_base, dec!(12.55));
        assert_eq!(tax_lines[0].tax_total, dec!(2.51));
        assert_eq!(tax_lines[0].in_tax_total, dec!(15.06));
        assert_eq!(tax_lines[1].tax.id, vat_b.id);
        assert_eq!(tax_lines[1].tax_total, dec!(1.00));
    }

    #[test]
    fn non_normal_lines_do_not_contribute_to_the_base() {
        let vat = tax(dec!(10));
        let mut end = with_totals(priced_line(dec!(0), dec!(0), &vat), dec!(99));
        end.line_type = LineType::EndOfPack;
        let lines = vec![
            with_totals(priced_line(dec!(1), dec!(10), &vat), dec!(10.00)),
            end,
        ];

        let tax_lines = TaxAggregator::new().tax_lines(&lines);

        assert_eq!(tax_lines.len(), 1);
        assert_eq!(tax_lines[0].ex_tax_base, dec!(10.00));
    }

    #[test]
    fn collects_distinct_equivalence_notes_in_order() {
        let vat = tax(dec!(0));
        let mut order = order();
        let mut first = priced_line(dec!(1), dec!(1), &vat);
        first.tax_equivalence = Some(equivalence("Reverse charge"));
        let mut title = OrderLine::title("Services");
        title.tax_equivalence = Some(equivalence("Art. 283-2"));
        let mut again = priced_line(dec!(1), dec!(1), &vat);
        again.tax_equivalence = Some(equivalence("Reverse charge"));
        order.add_line(first);
        order.add_line(title);
        order.add_line(again);

        TaxAggregator::new().aggregate(&mut order);

        assert_eq!(
            order.specific_notes.as_deref(),
            Some("Reverse charge\nArt. 283-2")
        );
    }

    #[test]
    fn customer_specific_note_replaces_equivalence_notes() {
        let vat = tax(dec!(0));
        let mut order = order();
        let mut client = Partner::customer("Acme");
        client.specific_tax_note = Some("Exempt under contract 42".to_string());
        order.client = Some(client);
        order.fiscal_position = Some(FiscalPosition {
            id: FiscalPositionId::new(),
            name: "Contract".to_string(),
            customer_specific_note: true,
            equivalences: Vec::new(),
        });
        let mut line = priced_line(dec!(1), dec!(1), &vat);
        line.tax_equivalence = Some(equivalence("Reverse charge"));
        order.add_line(line);

        TaxAggregator::new().aggregate(&mut order);

        assert_eq!(order.specific_notes.as_deref(), Some("Exempt under contract 42"));
    }
}
