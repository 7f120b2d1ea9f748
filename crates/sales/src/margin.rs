//! Gross margin, margin rate and markup, per line and per order.

use rust_decimal::Decimal;

use tradedoc_core::percent_rate;

use crate::order::{OrderLine, OrderMargin, SalesOrder};

/// Margin figures of one line, in company currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineMargin {
    pub gross_margin: Decimal,
    pub margin_rate: Decimal,
    pub markup: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarginCalculator {
    consider_zero_cost: bool,
}

impl MarginCalculator {
    pub fn new(consider_zero_cost: bool) -> Self {
        Self { consider_zero_cost }
    }

    /// Margin of `line`.
    ///
    /// Revenue is the company-currency excl.-tax total. When revenue or cost is zero
    /// the line has no margin, unless zero costs are considered, in which case the
    /// order-currency excl.-tax total is used as revenue.
    pub fn line_margin(&self, line: &OrderLine) -> LineMargin {
        if line.product_id.is_none() {
            return LineMargin::default();
        }

        let cost = line.sub_total_cost_price;
        let revenue = if cost.is_zero() || line.company_ex_tax_total.is_zero() {
            if !self.consider_zero_cost {
                return LineMargin::default();
            }
            line.ex_tax_total
        } else {
            line.company_ex_tax_total
        };

        let gross_margin = revenue - cost;
        LineMargin {
            gross_margin,
            margin_rate: percent_rate(revenue, gross_margin),
            markup: percent_rate(cost, gross_margin),
        }
    }

    /// Store the line's margin figures on it.
    pub fn compute_line_margin(&self, line: &mut OrderLine) {
        let margin = self.line_margin(line);
        line.sub_total_gross_margin = margin.gross_margin;
        line.sub_margin_rate = margin.margin_rate;
        line.sub_total_markup = margin.markup;
    }

    /// Recompute every line margin, then the order's.
    pub fn compute_all(&self, order: &mut SalesOrder) {
        for line in order.lines_mut() {
            self.compute_line_margin(line);
        }
        self.compute_order_margin(order);
    }

    /// Sum line contributions into the order margin.
    ///
    /// Lines without a product never count; zero-revenue lines count only when zero
    /// costs are considered.
    pub fn compute_order_margin(&self, order: &mut SalesOrder) {
        let mut revenue = Decimal::ZERO;
        let mut cost = Decimal::ZERO;
        let mut gross_margin = Decimal::ZERO;

        for line in order
            .lines()
            .iter()
            .filter(|line| line.is_normal() && line.product_id.is_some())
        {
            if line.company_ex_tax_total.is_zero() && !self.consider_zero_cost {
                continue;
            }
            revenue += line.company_ex_tax_total;
            cost += line.sub_total_cost_price;
            gross_margin += line.sub_total_gross_margin;
        }

        order.margin = OrderMargin {
            accounted_revenue: revenue,
            total_cost_price: cost,
            total_gross_margin: gross_margin,
            margin_rate: percent_rate(revenue, gross_margin),
            markup: percent_rate(cost, gross_margin),
        };
        tracing::debug!(
            order_id = %order.id,
            gross_margin = %order.margin.total_gross_margin,
            margin_rate = %order.margin.margin_rate,
            "order margin computed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{order, priced_line, tax};
    use rust_decimal_macros::dec;

    fn line(company_ex: Decimal, cost: Decimal) -> OrderLine {
        let mut line = priced_line(dec!(1), company_ex, &tax(dec!(20)));
        line.ex_tax_total = company_ex;
        line.company_ex_tax_total = company_ex;
        line.sub_total_cost_price = cost;
        line
    }

    #[test]
    fn line_margin_rate_and_markup() {
        let margin = MarginCalculator::new(false).line_margin(&line(dec!(100.00), dec!(60.00)));

        assert_eq!(margin.gross_margin, dec!(40.00));
        assert_eq!(margin.margin_rate, dec!(40.00));
        assert_eq!(margin.markup, dec!(66.67));
    }

    #[test]
    fn zero_cost_lines_depend_on_the_flag() {
        let free = line(dec!(50.00), Decimal::ZERO);

        assert_eq!(MarginCalculator::new(false).line_margin(&free), LineMargin::default());

        let considered = MarginCalculator::new(true).line_margin(&free);
        assert_eq!(considered.gross_margin, dec!(50.00));
        assert_eq!(considered.margin_rate, dec!(100.00));
        assert_eq!(considered.markup, Decimal::ZERO);
    }

    #[test]
    fn lines_without_product_have_no_margin() {
        let mut title = OrderLine::title("Text");
        title.company_ex_tax_total = dec!(10);
        assert_eq!(MarginCalculator::new(true).line_margin(&title), LineMargin::default());
    }

    #[test]
    fn order_margin_skips_zero_revenue_unless_considered() {
        let mut order = order();
        order.add_line(line(dec!(100.00), dec!(60.00)));
        order.add_line(line(Decimal::ZERO, dec!(15.00)));
        order.add_line(OrderLine::title("Text"));

        let calculator = MarginCalculator::new(false);
        calculator.compute_all(&mut order);
        assert_eq!(order.margin.accounted_revenue, dec!(100.00));
        assert_eq!(order.margin.total_cost_price, dec!(60.00));
        assert_eq!(order.margin.total_gross_margin, dec!(40.00));
        assert_eq!(order.margin.margin_rate, dec!(40.00));

        let calculator = MarginCalculator::new(true);
        calculator.compute_all(&mut order);
        assert_eq!(order.margin.total_cost_price, dec!(75.00));
        assert_eq!(order.margin.total_gross_margin, dec!(25.00));
        assert_eq!(order.margin.markup, dec!(33.33));
    }
}
