//! Order persistence boundary.

use std::collections::HashMap;
use std::sync::RwLock;

use tradedoc_core::{AggregateRoot, DomainError, DomainResult, ExpectedVersion, OrderId};

use crate::order::SalesOrder;

/// Order storage. Called only at transaction boundaries, never by the computation
/// components themselves.
pub trait OrderRepository: Send + Sync {
    fn find(&self, id: OrderId) -> DomainResult<Option<SalesOrder>>;

    /// Store `order` if the stored version matches `expected` (a missing order is at
    /// version 0), bumping its version.
    fn save(&self, order: &mut SalesOrder, expected: ExpectedVersion) -> DomainResult<()>;

    fn remove(&self, id: OrderId) -> DomainResult<()>;

    fn get(&self, id: OrderId) -> DomainResult<SalesOrder> {
        self.find(id)?.ok_or_else(DomainError::not_found)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, SalesOrder>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.read().map(|orders| orders.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> DomainError {
    DomainError::conflict("order store lock poisoned")
}

impl OrderRepository for InMemoryOrderRepository {
    fn find(&self, id: OrderId) -> DomainResult<Option<SalesOrder>> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders.get(&id).cloned())
    }

    fn save(&self, order: &mut SalesOrder, expected: ExpectedVersion) -> DomainResult<()> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let current = orders.get(&order.id).map(|stored| stored.version()).unwrap_or(0);
        expected.check(current)?;

        order.bump_version();
        orders.insert(order.id, order.clone());
        tracing::debug!(order_id = %order.id, version = order.version(), "order saved");
        Ok(())
    }

    fn remove(&self, id: OrderId) -> DomainResult<()> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        orders.remove(&id).map(|_| ()).ok_or_else(DomainError::not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::order;

    #[test]
    fn save_bumps_version_and_enforces_expectation() {
        let repo = InMemoryOrderRepository::new();
        let mut order = order();

        repo.save(&mut order, ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(order.version(), 1);
        assert_eq!(repo.get(order.id).unwrap().version(), 1);

        let mut stale = order.clone();
        repo.save(&mut order, ExpectedVersion::Exact(1)).unwrap();
        match repo.save(&mut stale, ExpectedVersion::Exact(1)) {
            Err(DomainError::Conflict(_)) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn remove_and_lookup_missing_orders() {
        let repo = InMemoryOrderRepository::new();
        let mut order = order();
        repo.save(&mut order, ExpectedVersion::Any).unwrap();

        repo.remove(order.id).unwrap();
        assert!(repo.is_empty());
        assert_eq!(repo.find(order.id).unwrap(), None);
        assert_eq!(repo.get(order.id), Err(DomainError::NotFound));
        assert_eq!(repo.remove(order.id), Err(DomainError::NotFound));
    }
}
