//! Subcommand implementations. Each returns the JSON document to print.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use tradedoc_core::{DomainError, OrderId, PackId, PriceListId, TeamId};
use tradedoc_sales::{
    Collaborators, MergeOutcome, MergeOverrides, MergeService, SalesConfig, SalesEngine,
    compute_pack_total,
};

use crate::scenario::{Scenario, repository_of};

#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeOptions {
    /// Re-resolve every line from the catalog before computing.
    pub resolve: bool,
    pub pack_totals: bool,
    pub check_discounts: bool,
}

pub fn compute(
    scenario: Scenario,
    config: &SalesConfig,
    options: ComputeOptions,
) -> anyhow::Result<Value> {
    let (catalog, orders) = scenario.into_parts();
    let engine = SalesEngine::new(Collaborators::from_single(&catalog), config);

    let mut results = Vec::with_capacity(orders.len());
    for mut order in orders {
        if options.resolve {
            let ids: Vec<_> = order.lines().iter().map(|line| line.id).collect();
            let resolver = engine.resolver();
            for id in ids {
                resolver.resolve_line(&mut order, id)?;
            }
        }
        engine.recompute(&mut order)?;
        if options.pack_totals {
            compute_pack_total(&mut order);
        }

        let discounts = if options.check_discounts {
            match engine.discount_guard().check_discounts(&order) {
                Ok(()) => json!("ok"),
                Err(DomainError::PolicyViolation { reason, lines }) => {
                    tracing::warn!(order_id = %order.id, %reason, "discount ceiling exceeded");
                    json!({ "reason": reason, "lines": lines })
                }
                Err(other) => return Err(other.into()),
            }
        } else {
            Value::Null
        };

        results.push(json!({ "order": order, "discount_check": discounts }));
    }
    Ok(Value::Array(results))
}

/// Expand catalog pack `pack` into order `order`, then recompute it with pack totals.
pub fn add_pack(
    scenario: Scenario,
    config: &SalesConfig,
    order_id: OrderId,
    pack: PackId,
    multiplier: Decimal,
) -> anyhow::Result<Value> {
    let (catalog, orders) = scenario.into_parts();
    let mut order = orders
        .into_iter()
        .find(|order| order.id == order_id)
        .ok_or_else(|| anyhow::anyhow!("order {order_id} is not part of the scenario"))?;
    let engine = SalesEngine::new(Collaborators::from_single(&catalog), config);

    let lines = engine.packs().insert_pack(&mut order, pack, multiplier)?;
    engine.recompute(&mut order)?;
    compute_pack_total(&mut order);
    Ok(json!({ "order": order, "inserted_lines": lines }))
}

#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    /// Orders to merge; all scenario orders when empty.
    pub orders: Vec<OrderId>,
    pub contact_from: Option<OrderId>,
    pub clear_contact: bool,
    pub price_list: Option<PriceListId>,
    pub clear_price_list: bool,
    pub team: Option<TeamId>,
    pub clear_team: bool,
    pub date: NaiveDate,
}

impl MergeRequest {
    fn overrides(&self, scenario: &Scenario) -> anyhow::Result<MergeOverrides> {
        let contact = match self.contact_from {
            Some(id) => {
                let order = scenario
                    .order(id)
                    .ok_or_else(|| anyhow::anyhow!("order {id} is not part of the scenario"))?;
                Some(order.contact.clone())
            }
            None if self.clear_contact => Some(None),
            None => None,
        };
        Ok(MergeOverrides {
            contact,
            price_list: settle(self.price_list, self.clear_price_list),
            team: settle(self.team, self.clear_team),
        })
    }
}

fn settle<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    match value {
        Some(value) => Some(Some(value)),
        None if clear => Some(None),
        None => None,
    }
}

pub fn merge(
    scenario: Scenario,
    config: &SalesConfig,
    request: &MergeRequest,
) -> anyhow::Result<Value> {
    let overrides = request.overrides(&scenario)?;
    let ids = if request.orders.is_empty() {
        scenario.orders.iter().map(|order| order.id).collect()
    } else {
        request.orders.clone()
    };

    let (catalog, orders) = scenario.into_parts();
    let repository = repository_of(orders)?;
    let engine = SalesEngine::new(Collaborators::from_single(&catalog), config);
    let service = MergeService::new(&repository, engine.merger());

    let outcome = service.merge(&ids, &overrides, request.date)?;
    let state = outcome.state();
    Ok(match outcome {
        MergeOutcome::Merged(order) => json!({ "state": state, "order": order }),
        MergeOutcome::NeedsConfirmation(result) => {
            json!({ "state": state, "differing": result.differing_fields() })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "taxes": [{"id": "01920000-0000-7000-8000-000000000001", "code": "VAT20", "rate": "20"}],
        "categories": [{"id": "01920000-0000-7000-8000-0000000000e1", "name": "Tools", "parent_id": null, "max_discount": "15"}],
        "products": [{
            "id": "01920000-0000-7000-8000-0000000000b1",
            "code": "WID",
            "name": "Widget",
            "category_id": "01920000-0000-7000-8000-0000000000e1",
            "sale_price": "10.00",
            "sale_currency": "EUR",
            "in_ati": false,
            "cost_price": "6.00",
            "sales_unit": null,
            "unit": null,
            "sale_tax_id": "01920000-0000-7000-8000-000000000001"
        }],
        "orders": [
            {
                "id": "01920000-0000-7000-8000-0000000000a1",
                "creation_date": "2024-06-03",
                "currency": "EUR",
                "company": {"id": "01920000-0000-7000-8000-0000000000c1", "name": "Forge SA", "currency": "EUR"},
                "client": {"id": "01920000-0000-7000-8000-0000000000d1", "kind": "customer", "name": "Acme", "specific_tax_note": null},
                "lines": [{"id": "01920000-0000-7000-8000-000000000f01", "sequence": 1, "product_id": "01920000-0000-7000-8000-0000000000b1", "quantity": "3"}]
            },
            {
                "id": "01920000-0000-7000-8000-0000000000a2",
                "creation_date": "2024-06-03",
                "currency": "EUR",
                "company": {"id": "01920000-0000-7000-8000-0000000000c1", "name": "Forge SA", "currency": "EUR"},
                "client": {"id": "01920000-0000-7000-8000-0000000000d1", "kind": "customer", "name": "Acme", "specific_tax_note": null},
                "team_id": "01920000-0000-7000-8000-00000000ab01",
                "lines": [{"id": "01920000-0000-7000-8000-000000000f02", "sequence": 1, "product_id": "01920000-0000-7000-8000-0000000000b1", "quantity": "1", "discount_amount": "20", "discount_type": "percent"}]
            }
        ]
    }"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
    }

    #[test]
    fn compute_resolves_prices_and_reports_discount_violations() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let options = ComputeOptions {
            resolve: true,
            pack_totals: true,
            check_discounts: true,
        };
        let output = compute(scenario, &SalesConfig::default(), options).unwrap();

        let first = &output[0];
        assert_eq!(first["order"]["totals"]["ex_tax_total"], json!("30.00"));
        assert_eq!(first["discount_check"], json!("ok"));
        // Resolution resets the manual 20 % discount, so the second order passes too.
        assert_eq!(output[1]["discount_check"], json!("ok"));
    }

    #[test]
    fn merge_waits_for_confirmation_until_the_team_is_settled() {
        let pending = merge(
            Scenario::parse(SCENARIO).unwrap(),
            &SalesConfig::default(),
            &MergeRequest {
                date: date(),
                ..MergeRequest::default()
            },
        )
        .unwrap();
        assert_eq!(pending["state"], json!("needs_confirmation"));
        assert_eq!(pending["differing"], json!(["team"]));

        let merged = merge(
            Scenario::parse(SCENARIO).unwrap(),
            &SalesConfig::default(),
            &MergeRequest {
                clear_team: true,
                date: date(),
                ..MergeRequest::default()
            },
        )
        .unwrap();
        assert_eq!(merged["state"], json!("merged"));
        assert_eq!(merged["order"]["lines"].as_array().map(Vec::len), Some(2));
        assert_eq!(merged["order"]["team_id"], Value::Null);
    }

    #[test]
    fn add_pack_brackets_the_components() {
        let mut scenario = Scenario::parse(SCENARIO).unwrap();
        let pack: tradedoc_catalog::PackTemplate = serde_json::from_value(json!({
            "id": "01920000-0000-7000-8000-0000000000a9",
            "name": "Kit",
            "currency": "EUR",
            "do_not_display_header_and_end_pack": false,
            "is_show_total": true,
            "is_hide_unit_amounts": false,
            "lines": [{"sequence": 1, "line_type": "normal", "product_id": "01920000-0000-7000-8000-0000000000b1", "product_name": "Widget", "quantity": "1", "price": "25.00"}]
        }))
        .unwrap();
        let pack_id = pack.id;
        scenario.catalog.packs.push(pack);
        let order_id = scenario.orders[0].id;

        let output = add_pack(
            scenario,
            &SalesConfig::default(),
            order_id,
            pack_id,
            Decimal::TWO,
        )
        .unwrap();
        assert_eq!(output["inserted_lines"].as_array().map(Vec::len), Some(3));
        let lines = output["order"]["lines"].as_array().unwrap();
        let end = &lines[lines.len() - 1];
        assert_eq!(end["line_type"], json!("end_of_pack"));
        assert_eq!(end["ex_tax_total"], json!("50.00"));
    }

    #[test]
    fn contact_override_must_name_a_scenario_order() {
        let request = MergeRequest {
            contact_from: Some(OrderId::new()),
            date: date(),
            ..MergeRequest::default()
        };
        let scenario = Scenario::parse(SCENARIO).unwrap();
        assert!(merge(scenario, &SalesConfig::default(), &request).is_err());
    }
}
