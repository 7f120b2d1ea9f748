//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two currency codes
/// `"EUR"` are the same currency, two tax-rate snapshots with the same record and
/// percentage are the same snapshot.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
