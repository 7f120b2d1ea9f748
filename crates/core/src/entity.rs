//! Entities: records whose identity survives changes to their attributes.

/// Entity marker + identity access.
///
/// Orders carry *snapshots* of catalog and party records (a client, a product's tax
/// rate). Two snapshots of the same entity may differ field by field and still
/// denote the same record, so comparisons across orders go through the id.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Whether `self` and `other` denote the same record, whatever their attributes.
    fn same_entity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
