//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// A part keeps its identity for life while its stock changes; two records with
/// the same id are the same part regardless of their stock.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
