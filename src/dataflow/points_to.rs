//! Points-to result abstraction consumed by downstream analyses.
//!
//! The points-to analysis itself runs upstream of this crate (it needs whole
//! -program knowledge this core deliberately does not have); what lives here
//! is the immutable *result* shape the analysis context carries: for each
//! reference-typed entity, the set of abstract locations it may point to.
//!
//! Downstream analyses consult the result to decide between strong and weak
//! updates: a write through a reference that may target several locations
//! cannot overwrite any single one of them. Absent information always
//! degrades to the conservative answer rather than failing.

use std::collections::{BTreeSet, HashMap};

use crate::dataflow::entity::EntityId;

/// An abstract memory location, typically an allocation site.
///
/// Locations are compared structurally by name; producers are expected to
/// mint one unique name per allocation site or named region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbstractLocation {
    /// Unique name of the allocation site or region.
    name: String,
}

impl AbstractLocation {
    /// Creates a location from its unique name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the unique name of this location.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The set of abstract locations a reference may point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSet {
    /// The reference may point anywhere the analysis can see.
    Unknown,
    /// The reference points to one of finitely many known locations.
    Known(BTreeSet<AbstractLocation>),
}

impl LocationSet {
    /// Creates a known set from an iterator of locations.
    #[must_use]
    pub fn known(locations: impl IntoIterator<Item = AbstractLocation>) -> Self {
        LocationSet::Known(locations.into_iter().collect())
    }

    /// Returns `true` if the reference targets exactly one known location.
    ///
    /// Singleton references admit strong updates through them.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        matches!(self, LocationSet::Known(locations) if locations.len() == 1)
    }
}

/// Immutable result of an upstream points-to analysis.
///
/// Built once through [`PointsToResultBuilder`], then shared read-only
/// (typically behind an `Arc`) with every analysis context that wants it.
///
/// # Examples
///
/// ```rust
/// use flowscope::dataflow::{AbstractLocation, EntityId, LocationSet, PointsToAnalysisResult};
///
/// let obj = EntityId::new(0);
/// let result = PointsToAnalysisResult::builder()
///     .record(obj, LocationSet::known([AbstractLocation::new("alloc0")]))
///     .build();
///
/// assert!(!result.may_alias_many(obj));
/// assert!(!result.may_alias_many(EntityId::new(9)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PointsToAnalysisResult {
    /// Per-entity location sets.
    locations: HashMap<EntityId, LocationSet>,
}

impl PointsToAnalysisResult {
    /// Starts building a result.
    #[must_use]
    pub fn builder() -> PointsToResultBuilder {
        PointsToResultBuilder::default()
    }

    /// Returns the recorded location set of `entity`, if any.
    #[must_use]
    pub fn locations(&self, entity: EntityId) -> Option<&LocationSet> {
        self.locations.get(&entity)
    }

    /// Returns `true` when a write through `entity` must be treated as weak.
    ///
    /// That is the case when the entity is recorded as pointing to several
    /// locations, or to an unknown set of them. Entities without recorded
    /// information are assumed distinct by identity, which keeps strong
    /// updates available when no points-to analysis ran at all.
    #[must_use]
    pub fn may_alias_many(&self, entity: EntityId) -> bool {
        match self.locations.get(&entity) {
            None => false,
            Some(LocationSet::Unknown) => true,
            Some(LocationSet::Known(locations)) => locations.len() > 1,
        }
    }
}

/// Builder for [`PointsToAnalysisResult`].
#[derive(Debug, Default)]
pub struct PointsToResultBuilder {
    /// Accumulated per-entity location sets.
    locations: HashMap<EntityId, LocationSet>,
}

impl PointsToResultBuilder {
    /// Records the location set of one entity, replacing any previous record.
    #[must_use]
    pub fn record(mut self, entity: EntityId, locations: LocationSet) -> Self {
        self.locations.insert(entity, locations);
        self
    }

    /// Finalizes the immutable result.
    #[must_use]
    pub fn build(self) -> PointsToAnalysisResult {
        PointsToAnalysisResult {
            locations: self.locations,
        }
    }
}
