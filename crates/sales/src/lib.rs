//! Sales order computation core.
//!
//! This crate computes commercial documents as deterministic domain logic (no IO,
//! no HTTP, no storage): line pricing and totals, per-rate tax aggregation, order
//! totals, margins, pack expansion and bracketing, discount ceilings and order
//! merging. Catalog, currency and tax lookups come in through the traits of
//! [`services`].

pub mod compute;
pub mod config;
pub mod discount_guard;
pub mod engine;
pub mod in_memory;
pub mod line;
pub mod margin;
pub mod merge;
pub mod order;
pub mod pack;
pub mod price;
pub mod repository;
pub mod services;
pub mod tax;

#[cfg(test)]
pub(crate) mod test_support;

pub use compute::{
    AdvancePaymentTotals, ComputeExtension, OrderComputer, TimetableSpread, compute_pack_total,
    reset_pack_total,
};
pub use config::{Feature, FeatureSet, SalesConfig};
pub use discount_guard::DiscountGuard;
pub use engine::SalesEngine;
pub use in_memory::{CatalogData, ExchangeRate, InMemoryCatalog};
pub use line::{LineInformationResolver, LineValueComputer, LineValues};
pub use margin::{LineMargin, MarginCalculator};
pub use merge::{
    FieldMerge, MergeField, MergeOutcome, MergeOverrides, MergeReconciler, MergeResult,
    MergeService, MergeState,
};
pub use order::{
    AdvancePayment, AdvancePaymentStatus, LineIndex, OrderLine, OrderMargin, OrderStatus,
    OrderTaxLine, OrderTotals, SalesOrder, Timetable,
};
pub use pack::PackExpander;
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use services::{
    CategoryMaxDiscountLookup, Collaborators, CurrencyConverter, PriceListResolution,
    PriceListService, PricingContext, PricingRuleEngine, ProductCatalog, TaxRateResolver,
};
pub use tax::TaxAggregator;
