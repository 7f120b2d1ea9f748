//! Fixtures shared by the unit tests of this crate.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use tradedoc_catalog::{Product, TaxRate};
use tradedoc_core::{CompanyId, CurrencyCode, ProductId, TaxRateId};
use tradedoc_parties::Company;

use crate::order::{OrderLine, SalesOrder};
use crate::price::convert_unit_price;

pub(crate) fn eur() -> CurrencyCode {
    CurrencyCode::new("EUR").unwrap()
}

pub(crate) fn usd() -> CurrencyCode {
    CurrencyCode::new("USD").unwrap()
}

pub(crate) fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

pub(crate) fn company() -> Company {
    Company {
        id: CompanyId::new(),
        name: "Forge SA".to_string(),
        currency: eur(),
    }
}

pub(crate) fn tax(rate: Decimal) -> TaxRate {
    TaxRate {
        id: TaxRateId::new(),
        code: format!("VAT{rate}"),
        rate,
    }
}

pub(crate) fn product(sale_price: Decimal, tax: &TaxRate) -> Product {
    Product {
        id: ProductId::new(),
        code: "WID-01".to_string(),
        name: "Widget".to_string(),
        category_id: None,
        sale_price,
        sale_currency: eur(),
        in_ati: false,
        cost_price: Decimal::ZERO,
        sales_unit: None,
        unit: None,
        sale_tax_id: Some(tax.id),
    }
}

/// Draft EUR order for a EUR company.
pub(crate) fn order() -> SalesOrder {
    SalesOrder::new(company(), eur(), date())
}

/// Normal line with price, tax-inclusive twin and tax already resolved.
pub(crate) fn priced_line(quantity: Decimal, price: Decimal, tax: &TaxRate) -> OrderLine {
    OrderLine {
        price: Some(price),
        in_tax_price: Some(convert_unit_price(price, tax.fraction(), true, 2)),
        tax_rate: Some(tax.clone()),
        product_name: "Widget".to_string(),
        ..OrderLine::for_product(ProductId::new(), quantity)
    }
}
