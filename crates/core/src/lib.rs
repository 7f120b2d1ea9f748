//! `tradedoc-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the shared error model, aggregate/entity markers and the decimal
//! rounding rules every commercial computation goes through.

pub mod aggregate;
pub mod currency;
pub mod decimal;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use currency::CurrencyCode;
pub use decimal::{DEFAULT_SCALE, RoundingMode, compute_amount, percent_rate, round};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    CategoryId, CompanyId, FiscalPositionId, LineId, OrderId, PackId, PartnerId, PriceListId,
    PricingRuleId, ProductId, TaxEquivalenceId, TaxRateId, TeamId,
};
pub use value_object::ValueObject;
