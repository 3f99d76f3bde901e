//! Sparse entity-value maps and the lifted map domain.
//!
//! [`AnalysisData`] is the state the engine threads through a control flow
//! graph: a mapping from [`EntityId`] to an abstract value. The map is sparse;
//! the absence of a key is observationally equivalent to the domain's default
//! value for that entity, so most entities never occupy memory.
//!
//! [`AnalysisDataDomain`] lifts an [`AbstractValueDomain`] over single values
//! to a domain over whole maps: pointwise merge and comparison, default-value
//! pruning, and the widening back-edge merge that guarantees loops converge.

use std::{cmp::Ordering, collections::HashMap};

use crate::dataflow::{domain::AbstractValueDomain, entity::EntityId};

/// A sparse mapping from analysis entities to abstract values.
///
/// Keys are unique and insertion order is irrelevant. An entity without an
/// entry holds the domain's default value; use
/// [`AnalysisDataDomain::value_or_default`] for lookups that respect this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisData<V> {
    /// The materialized entries.
    entries: HashMap<EntityId, V>,
}

impl<V> AnalysisData<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the materialized value for `entity`, if any.
    ///
    /// `None` means the entity holds the domain default, not that it is
    /// untracked; prefer [`AnalysisDataDomain::value_or_default`] when the
    /// distinction matters.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&V> {
        self.entries.get(&entity)
    }

    /// Sets the value for `entity`, replacing any previous entry.
    pub fn set(&mut self, entity: EntityId, value: V) {
        self.entries.insert(entity, value);
    }

    /// Removes the entry for `entity`, resetting it to the domain default.
    pub fn remove(&mut self, entity: EntityId) -> Option<V> {
        self.entries.remove(&entity)
    }

    /// Returns `true` if `entity` has a materialized entry.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entries.contains_key(&entity)
    }

    /// Iterates the materialized entries.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &V)> {
        self.entries.iter().map(|(&entity, value)| (entity, value))
    }

    /// Iterates the materialized entries with mutable values.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut V)> {
        self.entries.iter_mut().map(|(&entity, value)| (entity, value))
    }

    /// Keeps only the entries for which the predicate holds.
    pub fn retain(&mut self, mut keep: impl FnMut(EntityId, &V) -> bool) {
        self.entries.retain(|&entity, value| keep(entity, value));
    }

    /// Returns the number of materialized entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entry is materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for AnalysisData<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A value domain lifted pointwise over sparse entity-value maps.
///
/// Wraps an [`AbstractValueDomain`] and provides the map-level operations the
/// engine consumes: ordinary merges at join points, widening merges along back
/// edges, and the observational equality that decides convergence.
#[derive(Debug, Clone, Default)]
pub struct AnalysisDataDomain<D> {
    /// The underlying value domain.
    value_domain: D,
}

impl<D: AbstractValueDomain> AnalysisDataDomain<D> {
    /// Creates a map domain over the given value domain.
    #[must_use]
    pub fn new(value_domain: D) -> Self {
        Self { value_domain }
    }

    /// Returns the underlying value domain.
    #[must_use]
    pub fn value_domain(&self) -> &D {
        &self.value_domain
    }

    /// Returns the default value assumed for an entity without an entry.
    ///
    /// The default is the domain's greatest element: knowing nothing about a
    /// location is exactly "no useful information". The entity argument is
    /// part of the contract so a domain can specialize defaults by entity,
    /// even though the bundled domains do not.
    #[must_use]
    pub fn default_value(&self, entity: EntityId) -> D::Value {
        let _ = entity;
        self.value_domain.unknown()
    }

    /// Returns `true` when an entry holding `value` need not be materialized.
    ///
    /// This is the sparsity rule, not a correctness requirement: an entry
    /// equal to the default is indistinguishable from an absent one.
    #[must_use]
    pub fn can_skip_new_entry(&self, entity: EntityId, value: &D::Value) -> bool {
        *value == self.default_value(entity)
    }

    /// Returns the value of `entity` in `data`, falling back to the default.
    #[must_use]
    pub fn value_or_default(&self, data: &AnalysisData<D::Value>, entity: EntityId) -> D::Value {
        data.get(entity)
            .cloned()
            .unwrap_or_else(|| self.default_value(entity))
    }

    /// Removes entries equal to the domain default, keeping the map sparse.
    pub fn prune(&self, data: &mut AnalysisData<D::Value>) {
        data.retain(|entity, value| !self.can_skip_new_entry(entity, value));
    }

    /// Merges two maps pointwise.
    ///
    /// Every entity present in either map is merged through the value domain,
    /// with absent entries read as the default; result entries equal to the
    /// default are omitted.
    #[must_use]
    pub fn merge(
        &self,
        lhs: &AnalysisData<D::Value>,
        rhs: &AnalysisData<D::Value>,
    ) -> AnalysisData<D::Value> {
        let mut merged = AnalysisData::new();
        for (entity, left) in lhs.iter() {
            let right = self.value_or_default(rhs, entity);
            let value = self.value_domain.merge(left, &right);
            if !self.can_skip_new_entry(entity, &value) {
                merged.set(entity, value);
            }
        }
        for (entity, right) in rhs.iter() {
            if lhs.contains(entity) {
                continue;
            }
            let left = self.default_value(entity);
            let value = self.value_domain.merge(&left, right);
            if !self.can_skip_new_entry(entity, &value) {
                merged.set(entity, value);
            }
        }
        merged
    }

    /// Merges a loop-closing edge into the forward-edge state, widening first.
    ///
    /// Every entity present in *both* maps is offered to the value domain's
    /// [`widen_on_back_edge`](AbstractValueDomain::widen_on_back_edge); when it
    /// widens, the sentinel replaces the entity's value on both edges before
    /// the ordinary merge. This forces the lattice to climb on every loop
    /// iteration instead of oscillating between structurally unequal values,
    /// which is the termination guarantee for graphs with back edges.
    ///
    /// Debug builds assert the documented postcondition: both inputs compare
    /// at or below the result.
    #[must_use]
    pub fn merge_for_back_edge(
        &self,
        forward: &AnalysisData<D::Value>,
        back: &AnalysisData<D::Value>,
    ) -> AnalysisData<D::Value> {
        let mut widened_forward = forward.clone();
        let mut widened_back = back.clone();
        for (entity, forward_value) in forward.iter() {
            let Some(back_value) = back.get(entity) else {
                continue;
            };
            if let Some(widened) = self
                .value_domain
                .widen_on_back_edge(forward_value, back_value)
            {
                widened_forward.set(entity, widened.clone());
                widened_back.set(entity, widened);
            }
        }

        let merged = self.merge(&widened_forward, &widened_back);

        debug_assert!(
            matches!(
                self.compare(forward, &merged),
                Some(Ordering::Less | Ordering::Equal)
            ),
            "back-edge merge lost forward-edge information"
        );
        debug_assert!(
            matches!(
                self.compare(back, &merged),
                Some(Ordering::Less | Ordering::Equal)
            ),
            "back-edge merge lost back-edge information"
        );

        merged
    }

    /// Compares two maps pointwise in the lifted partial order.
    ///
    /// Returns `None` when some entities compare below and others above, or
    /// when any pointwise comparison is itself undefined.
    #[must_use]
    pub fn compare(
        &self,
        lhs: &AnalysisData<D::Value>,
        rhs: &AnalysisData<D::Value>,
    ) -> Option<Ordering> {
        let mut saw_less = false;
        let mut saw_greater = false;

        let mut check = |left: &D::Value, right: &D::Value| -> Option<()> {
            match self.value_domain.compare(left, right)? {
                Ordering::Less => saw_less = true,
                Ordering::Greater => saw_greater = true,
                Ordering::Equal => {}
            }
            Some(())
        };

        for (entity, left) in lhs.iter() {
            let right = self.value_or_default(rhs, entity);
            check(left, &right)?;
        }
        for (entity, right) in rhs.iter() {
            if lhs.contains(entity) {
                continue;
            }
            let left = self.default_value(entity);
            check(&left, right)?;
        }

        match (saw_less, saw_greater) {
            (false, false) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (true, true) => None,
        }
    }

    /// Observational equality: absent entries read as the domain default.
    ///
    /// This is the engine's convergence test. A map holding an explicit
    /// default entry is equal to the same map without it.
    #[must_use]
    pub fn equals(&self, lhs: &AnalysisData<D::Value>, rhs: &AnalysisData<D::Value>) -> bool {
        for (entity, left) in lhs.iter() {
            if *left != self.value_or_default(rhs, entity) {
                return false;
            }
        }
        for (entity, right) in rhs.iter() {
            if lhs.contains(entity) {
                continue;
            }
            if *right != self.default_value(entity) {
                return false;
            }
        }
        true
    }
}
