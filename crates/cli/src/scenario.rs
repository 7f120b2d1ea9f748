//! Scenario files: catalog content plus the orders to work on.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use tradedoc_core::{DomainResult, ExpectedVersion, OrderId};
use tradedoc_sales::{
    CatalogData, InMemoryCatalog, InMemoryOrderRepository, OrderRepository, SalesOrder,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(flatten)]
    pub catalog: CatalogData,
    #[serde(default)]
    pub orders: Vec<SalesOrder>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = serde_json::from_str(raw)?;
        tracing::debug!(
            products = scenario.catalog.products.len(),
            packs = scenario.catalog.packs.len(),
            orders = scenario.orders.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    pub fn order(&self, id: OrderId) -> Option<&SalesOrder> {
        self.orders.iter().find(|order| order.id == id)
    }

    /// Split into the in-memory catalog and the orders.
    pub fn into_parts(self) -> (InMemoryCatalog, Vec<SalesOrder>) {
        (InMemoryCatalog::from_data(self.catalog), self.orders)
    }
}

/// Store `orders` in a fresh in-memory repository.
pub fn repository_of(orders: Vec<SalesOrder>) -> DomainResult<InMemoryOrderRepository> {
    let repository = InMemoryOrderRepository::new();
    for mut order in orders {
        repository.save(&mut order, ExpectedVersion::Any)?;
    }
    Ok(repository)
}
