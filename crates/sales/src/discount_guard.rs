//! Maximum-discount policy per product category.

use rust_decimal::Decimal;

use tradedoc_core::{DomainError, DomainResult, LineId};

use crate::order::{OrderLine, SalesOrder};
use crate::price::discount_as_percent;
use crate::services::{CategoryMaxDiscountLookup, ProductCatalog};

pub struct DiscountGuard<'a> {
    catalog: &'a dyn ProductCatalog,
    categories: &'a dyn CategoryMaxDiscountLookup,
}

impl<'a> DiscountGuard<'a> {
    pub fn new(
        catalog: &'a dyn ProductCatalog,
        categories: &'a dyn CategoryMaxDiscountLookup,
    ) -> Self {
        Self {
            catalog,
            categories,
        }
    }

    /// Fail with a policy violation listing every line whose discount exceeds its
    /// authorised ceiling.
    ///
    /// Only drafts and confirmed orders being edited are checked. A category chain
    /// without any maximum leaves the line unrestricted; a derogation can raise the
    /// ceiling but never lower it.
    pub fn check_discounts(&self, order: &SalesOrder) -> DomainResult<()> {
        if !order.is_discount_controlled() {
            tracing::debug!(order_id = %order.id, status = ?order.status, "discount check skipped");
            return Ok(());
        }

        let mut offending: Vec<LineId> = Vec::new();
        for line in order.lines().iter().filter(|line| line.is_normal()) {
            let Some(ceiling) = self.ceiling(line)? else {
                continue;
            };
            let base = if order.in_ati { line.in_tax_price } else { line.price };
            let discount = discount_as_percent(line.discount(), base.unwrap_or_default());
            if discount > ceiling {
                tracing::debug!(line_id = %line.id, %discount, %ceiling, "discount above ceiling");
                offending.push(line.id);
            }
        }

        if offending.is_empty() {
            return Ok(());
        }
        tracing::warn!(order_id = %order.id, lines = offending.len(), "discount policy violated");
        Err(DomainError::policy_on_lines(
            format!("{} line(s) exceed the authorised discount", offending.len()),
            offending,
        ))
    }

    /// Authorised discount for `line` in percent, `None` when unrestricted.
    pub fn ceiling(&self, line: &OrderLine) -> DomainResult<Option<Decimal>> {
        if line.discount().is_none() {
            return Ok(None);
        }
        let Some(product_id) = line.product_id else {
            return Ok(None);
        };
        let product = self.catalog.require_product(product_id)?;
        let Some(category_id) = product.category_id else {
            return Ok(None);
        };

        let category_max = self.categories.max_discount_chain(category_id)?;
        if category_max.is_zero() {
            return Ok(None);
        }
        let derogation = line.discount_derogation.unwrap_or(Decimal::ZERO);
        Ok(Some(derogation.max(category_max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryCatalog;
    use crate::order::OrderStatus;
    use crate::test_support::{order, priced_line, product, tax};
    use rust_decimal_macros::dec;
    use tradedoc_catalog::{Discount, Product, ProductCategory};
    use tradedoc_core::CategoryId;

    struct Setup {
        catalog: InMemoryCatalog,
        capped: Product,
        free: Product,
    }

    fn setup() -> Setup {
        let vat = tax(dec!(20));
        let parent = ProductCategory {
            id: CategoryId::new(),
            name: "Hardware".to_string(),
            parent_id: None,
            max_discount: dec!(10),
        };
        let child = ProductCategory {
            id: CategoryId::new(),
            name: "Screws".to_string(),
            parent_id: Some(parent.id),
            max_discount: Decimal::ZERO,
        };
        let mut capped = product(dec!(10), &vat);
        capped.category_id = Some(child.id);
        let free = product(dec!(10), &vat);
        let catalog = InMemoryCatalog::new()
            .with_category(parent)
            .with_category(child)
            .with_product(capped.clone())
            .with_product(free.clone());
        Setup {
            catalog,
            capped,
            free,
        }
    }

    fn discounted(product: &Product, discount: Discount) -> OrderLine {
        let mut line = priced_line(dec!(1), dec!(10.00), &tax(dec!(20)));
        line.product_id = Some(product.id);
        line.set_discount(discount);
        line
    }

    #[test]
    fn lists_every_line_above_the_inherited_ceiling() {
        let Setup { catalog, capped, free } = setup();
        let guard = DiscountGuard::new(&catalog, &catalog);
        let mut order = order();
        let ok = order.add_line(discounted(&capped, Discount::percent(dec!(10))));
        let too_much = order.add_line(discounted(&capped, Discount::percent(dec!(15))));
        let fixed = order.add_line(discounted(&capped, Discount::fixed(dec!(2))));
        order.add_line(discounted(&free, Discount::percent(dec!(50))));

        match guard.check_discounts(&order) {
            Err(DomainError::PolicyViolation { lines, .. }) => {
                assert_eq!(lines, vec![too_much, fixed]);
                assert!(!lines.contains(&ok));
            }
            other => panic!("Expected PolicyViolation, got {other:?}"),
        }
    }

    #[test]
    fn derogation_raises_the_ceiling() {
        let Setup { catalog, capped, .. } = setup();
        let guard = DiscountGuard::new(&catalog, &catalog);
        let mut order = order();
        let mut line = discounted(&capped, Discount::percent(dec!(15)));
        line.discount_derogation = Some(dec!(20));
        order.add_line(line);

        assert!(guard.check_discounts(&order).is_ok());
    }

    #[test]
    fn derogation_never_lowers_the_ceiling() {
        let Setup { catalog, capped, .. } = setup();
        let guard = DiscountGuard::new(&catalog, &catalog);
        let mut order = order();
        let mut line = discounted(&capped, Discount::percent(dec!(8)));
        line.discount_derogation = Some(dec!(5));
        order.add_line(line);

        assert!(guard.check_discounts(&order).is_ok());
    }

    #[test]
    fn locked_orders_are_not_checked() {
        let Setup { catalog, capped, .. } = setup();
        let guard = DiscountGuard::new(&catalog, &catalog);
        let mut order = order();
        order.add_line(discounted(&capped, Discount::percent(dec!(90))));
        order.status = OrderStatus::Confirmed;

        assert!(guard.check_discounts(&order).is_ok());

        order.order_being_edited = true;
        assert!(guard.check_discounts(&order).is_err());
    }
}
