//! Merging several orders into a new one.
//!
//! Reconciliation goes `Init -> Validating -> NeedsConfirmation | Merged`. Identity
//! fields (currency, client, company) must agree and be set; tax treatment fields
//! (fiscal position, tax number) must agree; contact, price list and team may differ
//! if the caller supplies an override for each differing one.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tradedoc_catalog::FiscalPosition;
use tradedoc_core::{
    CurrencyCode, DomainError, DomainResult, Entity, ExpectedVersion, OrderId, PriceListId,
    TeamId,
};
use tradedoc_parties::{Company, Partner};

use crate::compute::OrderComputer;
use crate::config::SalesConfig;
use crate::margin::MarginCalculator;
use crate::order::SalesOrder;
use crate::repository::OrderRepository;
use crate::services::CurrencyConverter;

/// Fields compared across the merged orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeField {
    Currency,
    Client,
    Company,
    Contact,
    FiscalPosition,
    TaxNumber,
    PriceList,
    Team,
}

impl MergeField {
    pub const ALL: [MergeField; 8] = [
        MergeField::Currency,
        MergeField::Client,
        MergeField::Company,
        MergeField::Contact,
        MergeField::FiscalPosition,
        MergeField::TaxNumber,
        MergeField::PriceList,
        MergeField::Team,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MergeField::Currency => "currency",
            MergeField::Client => "client",
            MergeField::Company => "company",
            MergeField::Contact => "contact",
            MergeField::FiscalPosition => "fiscal position",
            MergeField::TaxNumber => "tax number",
            MergeField::PriceList => "price list",
            MergeField::Team => "team",
        }
    }

    /// Must be set and identical on every source.
    pub fn is_identity(self) -> bool {
        matches!(self, MergeField::Currency | MergeField::Client | MergeField::Company)
    }

    /// A difference can be settled by an operator override.
    pub fn is_confirmable(self) -> bool {
        matches!(self, MergeField::Contact | MergeField::PriceList | MergeField::Team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    Init,
    Validating,
    NeedsConfirmation,
    Merged,
}

/// Common value of one field over all sources, or the fact that it differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMerge<T> {
    pub common: Option<T>,
    pub differs: bool,
}

impl<T: Clone> FieldMerge<T> {
    /// Scan the sources: the first value is the candidate; any later value that
    /// differs (set vs unset included) clears it and flags the field.
    fn scan<'o>(
        sources: &'o [SalesOrder],
        get: impl Fn(&'o SalesOrder) -> Option<&'o T>,
        same: impl Fn(&T, &T) -> bool,
    ) -> Self
    where
        T: 'o,
    {
        let mut iter = sources.iter();
        let mut common = iter.next().and_then(&get).cloned();
        let mut differs = false;

        for order in iter {
            let equal = match (common.as_ref(), get(order)) {
                (Some(a), Some(b)) => same(a, b),
                (None, None) => !differs,
                _ => false,
            };
            if !equal {
                common = None;
                differs = true;
            }
        }

        Self { common, differs }
    }

    fn scan_eq<'o>(
        sources: &'o [SalesOrder],
        get: impl Fn(&'o SalesOrder) -> Option<&'o T>,
    ) -> Self
    where
        T: PartialEq + 'o,
    {
        Self::scan(sources, get, |a, b| a == b)
    }
}

/// Field-by-field reconciliation of the source orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub currency: FieldMerge<CurrencyCode>,
    pub client: FieldMerge<Partner>,
    pub company: FieldMerge<Company>,
    pub contact: FieldMerge<Partner>,
    pub fiscal_position: FieldMerge<FiscalPosition>,
    pub tax_number: FieldMerge<String>,
    pub price_list: FieldMerge<PriceListId>,
    pub team: FieldMerge<TeamId>,
}

impl MergeResult {
    pub fn from_sources(sources: &[SalesOrder]) -> Self {
        Self {
            currency: FieldMerge::scan_eq(sources, |o| o.currency.as_ref()),
            client: FieldMerge::scan(sources, |o| o.client.as_ref(), Partner::same_as),
            company: FieldMerge::scan(
                sources,
                |o| o.company.as_ref(),
                |a: &Company, b: &Company| a.same_entity(b),
            ),
            contact: FieldMerge::scan(sources, |o| o.contact.as_ref(), Partner::same_as),
            fiscal_position: FieldMerge::scan(
                sources,
                |o| o.fiscal_position.as_ref(),
                |a: &FiscalPosition, b: &FiscalPosition| a.same_entity(b),
            ),
            tax_number: FieldMerge::scan_eq(sources, |o| o.tax_number.as_ref()),
            price_list: FieldMerge::scan_eq(sources, |o| o.price_list_id.as_ref()),
            team: FieldMerge::scan_eq(sources, |o| o.team_id.as_ref()),
        }
    }

    pub fn differs(&self, field: MergeField) -> bool {
        match field {
            MergeField::Currency => self.currency.differs,
            MergeField::Client => self.client.differs,
            MergeField::Company => self.company.differs,
            MergeField::Contact => self.contact.differs,
            MergeField::FiscalPosition => self.fiscal_position.differs,
            MergeField::TaxNumber => self.tax_number.differs,
            MergeField::PriceList => self.price_list.differs,
            MergeField::Team => self.team.differs,
        }
    }

    pub fn differing_fields(&self) -> Vec<MergeField> {
        MergeField::ALL
            .into_iter()
            .filter(|field| self.differs(*field))
            .collect()
    }

    /// Whether any operator-resolvable field differs.
    pub fn needs_confirmation(&self) -> bool {
        self.differing_fields()
            .into_iter()
            .any(MergeField::is_confirmable)
    }

    fn is_set(&self, field: MergeField) -> bool {
        match field {
            MergeField::Currency => self.currency.common.is_some(),
            MergeField::Client => self.client.common.is_some(),
            MergeField::Company => self.company.common.is_some(),
            MergeField::Contact => self.contact.common.is_some(),
            MergeField::FiscalPosition => self.fiscal_position.common.is_some(),
            MergeField::TaxNumber => self.tax_number.common.is_some(),
            MergeField::PriceList => self.price_list.common.is_some(),
            MergeField::Team => self.team.common.is_some(),
        }
    }

    /// Reject merges the operator cannot resolve.
    fn check_policy(&self) -> DomainResult<()> {
        if let Some(field) = MergeField::ALL
            .into_iter()
            .find(|field| self.differs(*field) && !field.is_confirmable())
        {
            return Err(DomainError::policy(format!(
                "orders cannot be merged: their {} differs",
                field.as_str()
            )));
        }
        if let Some(field) = MergeField::ALL
            .into_iter()
            .find(|field| field.is_identity() && !self.is_set(*field))
        {
            return Err(DomainError::policy(format!(
                "orders cannot be merged: no {} set",
                field.as_str()
            )));
        }
        Ok(())
    }
}

/// Operator choices for the confirmable fields. `Some(value)` settles the field,
/// `Some(None)` explicitly clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOverrides {
    pub contact: Option<Option<Partner>>,
    pub price_list: Option<Option<PriceListId>>,
    pub team: Option<Option<TeamId>>,
}

impl MergeOverrides {
    fn covers(&self, field: MergeField) -> bool {
        match field {
            MergeField::Contact => self.contact.is_some(),
            MergeField::PriceList => self.price_list.is_some(),
            MergeField::Team => self.team.is_some(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Some confirmable fields differ and have no override; nothing was built.
    NeedsConfirmation(MergeResult),
    Merged(Box<SalesOrder>),
}

impl MergeOutcome {
    pub fn state(&self) -> MergeState {
        match self {
            MergeOutcome::NeedsConfirmation(_) => MergeState::NeedsConfirmation,
            MergeOutcome::Merged(_) => MergeState::Merged,
        }
    }
}

pub struct MergeReconciler<'a> {
    computer: OrderComputer<'a>,
    margins: MarginCalculator,
}

impl<'a> MergeReconciler<'a> {
    pub fn new(currency: &'a dyn CurrencyConverter, config: &SalesConfig) -> Self {
        Self {
            computer: OrderComputer::new(currency, &config.features),
            margins: MarginCalculator::new(config.consider_zero_cost),
        }
    }

    /// Merge `sources` into a new order created on `creation_date`.
    ///
    /// Lines keep their ids and are renumbered contiguously, source by source, in
    /// their original order. The result is fully computed. The sources are left
    /// untouched; deleting them is up to the caller.
    pub fn merge(
        &self,
        sources: &[SalesOrder],
        overrides: &MergeOverrides,
        creation_date: NaiveDate,
    ) -> DomainResult<MergeOutcome> {
        if sources.len() < 2 {
            return Err(DomainError::validation("at least two orders are required to merge"));
        }
        ensure_distinct(sources.iter().map(|order| order.id))?;
        tracing::debug!(state = ?MergeState::Init, sources = sources.len(), "merge started");

        let result = MergeResult::from_sources(sources);
        let differing: Vec<&str> = result
            .differing_fields()
            .into_iter()
            .map(MergeField::as_str)
            .collect();
        tracing::debug!(state = ?MergeState::Validating, ?differing, "merge fields compared");
        result.check_policy()?;

        let unresolved = result
            .differing_fields()
            .into_iter()
            .any(|field| field.is_confirmable() && !overrides.covers(field));
        if unresolved {
            tracing::info!(
                state = ?MergeState::NeedsConfirmation,
                ?differing,
                "merge needs confirmation"
            );
            return Ok(MergeOutcome::NeedsConfirmation(result));
        }

        let merged = self.build(sources, result, overrides, creation_date)?;
        tracing::info!(
            state = ?MergeState::Merged,
            order_id = %merged.id,
            lines = merged.lines().len(),
            "orders merged"
        );
        Ok(MergeOutcome::Merged(Box::new(merged)))
    }

    fn build(
        &self,
        sources: &[SalesOrder],
        result: MergeResult,
        overrides: &MergeOverrides,
        creation_date: NaiveDate,
    ) -> DomainResult<SalesOrder> {
        let missing = |field: MergeField| {
            DomainError::policy(format!("orders cannot be merged: no {} set", field.as_str()))
        };
        let company = result.company.common.ok_or_else(|| missing(MergeField::Company))?;
        let currency = result.currency.common.ok_or_else(|| missing(MergeField::Currency))?;

        let mut merged = SalesOrder::new(company, currency, creation_date);
        merged.client = result.client.common;
        merged.contact = overrides.contact.clone().unwrap_or(result.contact.common);
        merged.price_list_id = overrides.price_list.unwrap_or(result.price_list.common);
        merged.team_id = overrides.team.unwrap_or(result.team.common);
        merged.fiscal_position = result.fiscal_position.common;
        merged.tax_number = result.tax_number.common;
        merged.in_ati = sources.first().is_some_and(|order| order.in_ati);

        let references: Vec<&str> = sources
            .iter()
            .filter_map(|order| order.external_reference.as_deref())
            .filter(|reference| !reference.is_empty())
            .collect();
        if !references.is_empty() {
            merged.external_reference = Some(references.join("|"));
        }

        let mut sequence = 0;
        let mut lines = Vec::new();
        for source in sources {
            for line in source.lines() {
                sequence += 1;
                let mut line = line.clone();
                line.sequence = sequence;
                lines.push(line);
            }
        }
        merged.insert_lines(lines);

        self.computer.compute_order(&mut merged)?;
        self.margins.compute_all(&mut merged);
        Ok(merged)
    }
}

fn ensure_distinct(ids: impl IntoIterator<Item = OrderId>) -> DomainResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(DomainError::validation(format!("order {id} is listed twice")));
        }
    }
    Ok(())
}

/// Loads, merges and commits through an [`OrderRepository`].
pub struct MergeService<'a, R: OrderRepository> {
    repository: &'a R,
    reconciler: MergeReconciler<'a>,
}

impl<'a, R: OrderRepository> MergeService<'a, R> {
    pub fn new(repository: &'a R, reconciler: MergeReconciler<'a>) -> Self {
        Self {
            repository,
            reconciler,
        }
    }

    /// Merge the stored orders `ids`.
    ///
    /// Only a `Merged` outcome writes anything: the new order is saved, then the
    /// sources are removed. Every check runs before the first write.
    pub fn merge(
        &self,
        ids: &[OrderId],
        overrides: &MergeOverrides,
        creation_date: NaiveDate,
    ) -> DomainResult<MergeOutcome> {
        ensure_distinct(ids.iter().copied())?;
        let sources = ids
            .iter()
            .map(|id| self.repository.get(*id))
            .collect::<DomainResult<Vec<_>>>()?;

        match self.reconciler.merge(&sources, overrides, creation_date)? {
            MergeOutcome::Merged(mut merged) => {
                for source in &sources {
                    if self.repository.find(source.id)?.is_none() {
                        return Err(DomainError::not_found());
                    }
                }
                self.repository.save(&mut merged, ExpectedVersion::Exact(0))?;
                for source in &sources {
                    self.repository.remove(source.id)?;
                }
                Ok(MergeOutcome::Merged(merged))
            }
            pending => Ok(pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryCatalog;
    use crate::order::OrderLine;
    use crate::repository::InMemoryOrderRepository;
    use crate::test_support::{company, date, eur, priced_line, tax, usd};
    use rust_decimal_macros::dec;
    use tradedoc_core::FiscalPositionId;

    fn source(company: &Company, client: &Partner, lines: usize) -> SalesOrder {
        let vat = tax(dec!(20));
        let mut order = SalesOrder::new(company.clone(), eur(), date());
        order.client = Some(client.clone());
        for _ in 0..lines {
            let mut line = priced_line(dec!(1), dec!(10), &vat);
            line.ex_tax_total = dec!(10.00);
            order.add_line(line);
        }
        order
    }

    #[test]
    fn identical_sources_merge_without_confirmation() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let reconciler = MergeReconciler::new(&catalog, &config);
        let company = company();
        let client = Partner::customer("Acme");
        let mut first = source(&company, &client, 2);
        first.external_reference = Some("PO-1".to_string());
        let mut second = source(&company, &client, 3);
        second.external_reference = Some("PO-2".to_string());

        let result = MergeResult::from_sources(&[first.clone(), second.clone()]);
        assert!(!result.needs_confirmation());

        let outcome = reconciler
            .merge(&[first, second], &MergeOverrides::default(), date())
            .unwrap();
        let MergeOutcome::Merged(merged) = outcome else {
            panic!("expected a merged order");
        };
        let sequences: Vec<u32> = merged.lines().iter().map(|l| l.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert_eq!(merged.totals.ex_tax_total, dec!(50.00));
        assert_eq!(merged.external_reference.as_deref(), Some("PO-1|PO-2"));
        assert_eq!(merged.client.as_ref().map(|c| c.id), Some(client.id));
    }

    #[test]
    fn differing_client_is_a_policy_violation() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let reconciler = MergeReconciler::new(&catalog, &config);
        let company = company();
        let first = source(&company, &Partner::customer("Acme"), 1);
        let second = source(&company, &Partner::customer("Globex"), 1);

        match reconciler.merge(&[first, second], &MergeOverrides::default(), date()) {
            Err(DomainError::PolicyViolation { reason, lines }) => {
                assert!(reason.contains("client"));
                assert!(lines.is_empty());
            }
            other => panic!("Expected PolicyViolation, got {other:?}"),
        }
    }

    #[test]
    fn agreed_but_missing_currency_is_a_policy_violation() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let reconciler = MergeReconciler::new(&catalog, &config);
        let company = company();
        let client = Partner::customer("Acme");
        let mut first = source(&company, &client, 1);
        let mut second = source(&company, &client, 1);
        first.currency = None;
        second.currency = None;

        let result = MergeResult::from_sources(&[first.clone(), second.clone()]);
        assert!(!result.currency.differs);

        match reconciler.merge(&[first, second], &MergeOverrides::default(), date()) {
            Err(DomainError::PolicyViolation { reason, .. }) if reason.contains("no currency") => {}
            other => panic!("Expected PolicyViolation, got {other:?}"),
        }
    }

    #[test]
    fn differing_currency_or_fiscal_position_is_rejected() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let reconciler = MergeReconciler::new(&catalog, &config);
        let company = company();
        let client = Partner::customer("Acme");
        let first = source(&company, &client, 1);
        let mut second = source(&company, &client, 1);
        second.currency = Some(usd());

        assert!(matches!(
            reconciler.merge(&[first.clone(), second], &MergeOverrides::default(), date()),
            Err(DomainError::PolicyViolation { .. })
        ));

        let mut third = source(&company, &client, 1);
        third.fiscal_position = Some(FiscalPosition {
            id: FiscalPositionId::new(),
            name: "Export".to_string(),
            customer_specific_note: false,
            equivalences: Vec::new(),
        });
        match reconciler.merge(&[first, third], &MergeOverrides::default(), date()) {
            Err(DomainError::PolicyViolation { reason, .. })
                if reason.contains("fiscal position") => {}
            other => panic!("Expected PolicyViolation, got {other:?}"),
        }
    }

    #[test]
    fn differing_contact_needs_confirmation_then_uses_override() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let reconciler = MergeReconciler::new(&catalog, &config);
        let company = company();
        let client = Partner::customer("Acme");
        let mut first = source(&company, &client, 1);
        first.contact = Some(Partner::customer("Alice"));
        let second = source(&company, &client, 1);
        let sources = [first, second];

        let outcome = reconciler
            .merge(&sources, &MergeOverrides::default(), date())
            .unwrap();
        assert_eq!(outcome.state(), MergeState::NeedsConfirmation);
        let MergeOutcome::NeedsConfirmation(result) = outcome else {
            panic!("expected confirmation request");
        };
        assert_eq!(result.differing_fields(), vec![MergeField::Contact]);

        let bob = Partner::customer("Bob");
        let overrides = MergeOverrides {
            contact: Some(Some(bob.clone())),
            ..MergeOverrides::default()
        };
        let outcome = reconciler.merge(&sources, &overrides, date()).unwrap();
        let MergeOutcome::Merged(merged) = outcome else {
            panic!("expected a merged order");
        };
        assert_eq!(merged.contact.as_ref().map(|c| c.id), Some(bob.id));
    }

    #[test]
    fn fewer_than_two_orders_is_a_validation_error() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let reconciler = MergeReconciler::new(&catalog, &config);
        let single = source(&company(), &Partner::customer("Acme"), 1);

        match reconciler.merge(&[single], &MergeOverrides::default(), date()) {
            Err(DomainError::Validation(_)) => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn service_commits_only_merged_outcomes() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let repo = InMemoryOrderRepository::new();
        let service = MergeService::new(&repo, MergeReconciler::new(&catalog, &config));
        let company = company();
        let client = Partner::customer("Acme");

        let mut first = source(&company, &client, 1);
        first.team_id = Some(TeamId::new());
        let mut second = source(&company, &client, 2);
        repo.save(&mut first, ExpectedVersion::Any).unwrap();
        repo.save(&mut second, ExpectedVersion::Any).unwrap();
        let ids = [first.id, second.id];

        let outcome = service.merge(&ids, &MergeOverrides::default(), date()).unwrap();
        assert_eq!(outcome.state(), MergeState::NeedsConfirmation);
        assert_eq!(repo.len(), 2);

        let overrides = MergeOverrides {
            team: Some(None),
            ..MergeOverrides::default()
        };
        let MergeOutcome::Merged(merged) = service.merge(&ids, &overrides, date()).unwrap() else {
            panic!("expected a merged order");
        };
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.find(first.id).unwrap(), None);
        let stored = repo.get(merged.id).unwrap();
        assert_eq!(stored.lines().len(), 3);
        assert_eq!(stored.team_id, None);
        assert!(stored.lines().iter().all(|l: &OrderLine| l.is_normal()));
    }

    #[test]
    fn repeated_source_is_rejected_before_anything_is_written() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let repo = InMemoryOrderRepository::new();
        let reconciler = MergeReconciler::new(&catalog, &config);
        let mut order = source(&company(), &Partner::customer("Acme"), 2);
        repo.save(&mut order, ExpectedVersion::Any).unwrap();

        match reconciler.merge(
            &[order.clone(), order.clone()],
            &MergeOverrides::default(),
            date(),
        ) {
            Err(DomainError::Validation(_)) => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }

        let service = MergeService::new(&repo, reconciler);
        match service.merge(&[order.id, order.id], &MergeOverrides::default(), date()) {
            Err(DomainError::Validation(_)) => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.get(order.id).unwrap().lines().len(), 2);
    }

    #[test]
    fn missing_source_leaves_the_store_untouched() {
        let catalog = InMemoryCatalog::new();
        let config = SalesConfig::default();
        let repo = InMemoryOrderRepository::new();
        let service = MergeService::new(&repo, MergeReconciler::new(&catalog, &config));
        let mut stored = source(&company(), &Partner::customer("Acme"), 1);
        repo.save(&mut stored, ExpectedVersion::Any).unwrap();

        assert_eq!(
            service
                .merge(&[stored.id, OrderId::new()], &MergeOverrides::default(), date())
                .unwrap_err(),
            DomainError::NotFound
        );
        assert_eq!(repo.len(), 1);
        assert!(repo.find(stored.id).unwrap().is_some());
    }
}
