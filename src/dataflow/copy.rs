//! Copy analysis: must-alias tracking between storage locations.
//!
//! Copy analysis computes, for every storage location at every block boundary,
//! the set of other locations that are *guaranteed* to hold the same value.
//! Entity-to-entity assignments establish copy relations, any other write to
//! a location dissolves them, and control flow joins keep only the relations
//! that hold on every incoming path (set intersection).
//!
//! The result is a prerequisite input for the value content analysis: reads
//! can fall back to a must-copy alias, and strong updates propagate to the
//! whole copy class. Run it first and hand its result (and the entity
//! interner) to the downstream context:
//!
//! ```rust,ignore
//! let mut copy_context = AnalysisContext::new(&cfg, owner.clone(), CopySetDomain);
//! let copies = Arc::new(CopyAnalysis::analyze(&mut copy_context)?);
//! let mut context = AnalysisContext::new(&cfg, owner, ValueContentDomain)
//!     .with_entities(copy_context.into_entities())
//!     .with_copy_result(copies);
//! ```

use std::{cmp::Ordering, collections::BTreeSet};

use crate::{
    cfg::BlockId,
    dataflow::{
        context::AnalysisContext,
        data::AnalysisData,
        domain::AbstractValueDomain,
        engine::{DataFlowEngine, OperationVisitor},
        entity::EntityId,
        result::DataFlowAnalysisResult,
    },
    ir::{Expr, Operation},
    Result,
};

/// An element of the copy lattice: the must-copy class of one entity.
///
/// The tracked set never contains the entity itself; membership is implicit.
/// The empty set is the top element (no alias is guaranteed), and merges
/// intersect, so copy information only ever shrinks at joins. Chains are
/// finite because the entity universe of a run is finite, so the domain needs
/// no back-edge widening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopySetValue {
    /// No value has reached this location yet (the bottom element).
    Untracked,
    /// The locations guaranteed to hold the same value as this one.
    Copies(BTreeSet<EntityId>),
}

impl CopySetValue {
    /// Iterates the members of the copy class, excluding the entity itself.
    ///
    /// [`Untracked`](Self::Untracked) has no members.
    pub fn members(&self) -> impl Iterator<Item = EntityId> + '_ {
        match self {
            CopySetValue::Untracked => None,
            CopySetValue::Copies(set) => Some(set.iter().copied()),
        }
        .into_iter()
        .flatten()
    }
}

/// The copy lattice as an [`AbstractValueDomain`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CopySetDomain;

impl AbstractValueDomain for CopySetDomain {
    type Value = CopySetValue;

    fn bottom(&self) -> Self::Value {
        CopySetValue::Untracked
    }

    fn unknown(&self) -> Self::Value {
        CopySetValue::Copies(BTreeSet::new())
    }

    fn merge(&self, lhs: &Self::Value, rhs: &Self::Value) -> Self::Value {
        match (lhs, rhs) {
            (CopySetValue::Untracked, other) | (other, CopySetValue::Untracked) => other.clone(),
            (CopySetValue::Copies(left), CopySetValue::Copies(right)) => {
                CopySetValue::Copies(left.intersection(right).copied().collect())
            }
        }
    }

    fn compare(&self, lhs: &Self::Value, rhs: &Self::Value) -> Option<Ordering> {
        match (lhs, rhs) {
            (CopySetValue::Untracked, CopySetValue::Untracked) => Some(Ordering::Equal),
            (CopySetValue::Untracked, _) => Some(Ordering::Less),
            (_, CopySetValue::Untracked) => Some(Ordering::Greater),
            (CopySetValue::Copies(left), CopySetValue::Copies(right)) => {
                if left == right {
                    Some(Ordering::Equal)
                } else if left.is_superset(right) {
                    // More guaranteed aliases means more information, which
                    // sits lower in the lattice.
                    Some(Ordering::Less)
                } else if left.is_subset(right) {
                    Some(Ordering::Greater)
                } else {
                    None
                }
            }
        }
    }
}

/// The copy (must-alias) analysis over the bundled statement IR.
#[derive(Debug, Default)]
pub struct CopyAnalysis;

impl CopyAnalysis {
    /// Runs the analysis over the context's graph to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`](crate::Error::Cancelled) when the
    /// context's cancellation token is signalled mid-run.
    pub fn analyze(
        context: &mut AnalysisContext<'_, Operation, CopySetDomain>,
    ) -> Result<CopyAnalysisResult> {
        let mut engine = DataFlowEngine::new();
        let mut visitor = CopyVisitor;
        let result = engine.run(context, &mut visitor)?;
        Ok(CopyAnalysisResult { result })
    }
}

/// Immutable result of a copy analysis run.
///
/// Wraps the raw per-block maps behind queries phrased in terms of copy
/// classes. Shared read-only (typically behind an `Arc`) with downstream
/// analyses; never mutated after construction.
#[derive(Debug, Clone)]
pub struct CopyAnalysisResult {
    /// The converged per-block copy states.
    result: DataFlowAnalysisResult<CopySetValue>,
}

impl CopyAnalysisResult {
    /// Returns the entities guaranteed to hold the same value as `entity` on
    /// entry to `block`.
    ///
    /// Unknown blocks and untracked entities yield the empty class.
    #[must_use]
    pub fn copies_on_entry(&self, block: BlockId, entity: EntityId) -> Vec<EntityId> {
        Self::class_of(self.result.block(block).map(|b| b.input()), entity)
    }

    /// Returns the entities guaranteed to hold the same value as `entity` on
    /// exit from `block`.
    #[must_use]
    pub fn copies_on_exit(&self, block: BlockId, entity: EntityId) -> Vec<EntityId> {
        Self::class_of(self.result.block(block).map(|b| b.output()), entity)
    }

    /// Returns the underlying per-block result collection.
    #[must_use]
    pub fn result(&self) -> &DataFlowAnalysisResult<CopySetValue> {
        &self.result
    }

    /// Extracts the copy class of `entity` from an optional state map.
    fn class_of(data: Option<&AnalysisData<CopySetValue>>, entity: EntityId) -> Vec<EntityId> {
        match data.and_then(|state| state.get(entity)) {
            Some(CopySetValue::Copies(set)) => set.iter().copied().collect(),
            _ => Vec::new(),
        }
    }
}

/// Transfer function of the copy analysis.
#[derive(Debug, Default)]
struct CopyVisitor;

impl CopyVisitor {
    /// Dissolves every copy relation involving `target`.
    fn kill(target: EntityId, state: &mut AnalysisData<CopySetValue>) {
        state.remove(target);
        for (_, value) in state.iter_mut() {
            if let CopySetValue::Copies(set) = value {
                set.remove(&target);
            }
        }
    }

    /// Reads the copy class of `entity`, treating untracked as empty.
    fn class(state: &AnalysisData<CopySetValue>, entity: EntityId) -> BTreeSet<EntityId> {
        match state.get(entity) {
            Some(CopySetValue::Copies(set)) => set.clone(),
            _ => BTreeSet::new(),
        }
    }
}

impl OperationVisitor<Operation> for CopyVisitor {
    type Domain = CopySetDomain;

    fn visit_operation(
        &mut self,
        _block: BlockId,
        operation: &Operation,
        mut state: AnalysisData<CopySetValue>,
        context: &mut AnalysisContext<'_, Operation, CopySetDomain>,
    ) -> AnalysisData<CopySetValue> {
        match operation {
            Operation::Assign { target, value } => {
                let target_id = context.intern_place(target);
                if let Expr::Read(source) = value {
                    let source_id = context.intern_place(source);
                    if source_id == target_id {
                        // Self-assignment changes nothing.
                        return state;
                    }
                    Self::kill(target_id, &mut state);
                    // The target joins the source's copy class.
                    let mut class = Self::class(&state, source_id);
                    class.insert(source_id);
                    class.remove(&target_id);
                    for &member in &class {
                        let mut member_class = Self::class(&state, member);
                        member_class.insert(target_id);
                        member_class.remove(&member);
                        state.set(member, CopySetValue::Copies(member_class));
                    }
                    state.set(target_id, CopySetValue::Copies(class));
                } else {
                    Self::kill(target_id, &mut state);
                }
            }
            Operation::Call { .. } => {
                if context.config().is_pessimistic() {
                    // An opaque callee may rewrite any heap-reached location.
                    let clobbered: Vec<EntityId> = context.entities().heap_reached().collect();
                    for entity in clobbered {
                        Self::kill(entity, &mut state);
                    }
                }
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cfg::{CfgEdgeKind, ControlFlowGraph, ControlFlowGraphBuilder},
        dataflow::EntityKind,
        ir::{OwningSymbol, Place, SymbolId},
    };

    fn owner() -> OwningSymbol {
        OwningSymbol::new(SymbolId::new(1), "Sample::Method")
    }

    fn assign(target: &str, source: &str) -> Operation {
        Operation::assign(Place::local(target), Expr::read(Place::local(source)))
    }

    #[test]
    fn test_domain_merge_is_intersection() {
        let domain = CopySetDomain;
        let a = CopySetValue::Copies(BTreeSet::from([EntityId::new(1), EntityId::new(2)]));
        let b = CopySetValue::Copies(BTreeSet::from([EntityId::new(2), EntityId::new(3)]));
        assert_eq!(
            domain.merge(&a, &b),
            CopySetValue::Copies(BTreeSet::from([EntityId::new(2)]))
        );
    }

    #[test]
    fn test_domain_laws() {
        let domain = CopySetDomain;
        let samples = vec![
            CopySetValue::Untracked,
            CopySetValue::Copies(BTreeSet::new()),
            CopySetValue::Copies(BTreeSet::from([EntityId::new(1)])),
            CopySetValue::Copies(BTreeSet::from([EntityId::new(1), EntityId::new(2)])),
            CopySetValue::Copies(BTreeSet::from([EntityId::new(2)])),
        ];
        for a in &samples {
            assert_eq!(&domain.merge(a, a), a);
            assert_eq!(domain.merge(a, &domain.bottom()), *a);
            for b in &samples {
                assert_eq!(domain.merge(a, b), domain.merge(b, a));
                let merged = domain.merge(a, b);
                assert!(matches!(
                    domain.compare(a, &merged),
                    Some(Ordering::Less | Ordering::Equal)
                ));
            }
        }
    }

    fn straight_line(operations: Vec<Operation>) -> ControlFlowGraph<Operation> {
        let mut builder = ControlFlowGraphBuilder::new();
        builder.add_block(operations);
        builder.build().unwrap()
    }

    #[test]
    fn test_copy_chain_builds_one_class() {
        let cfg = straight_line(vec![assign("y", "x"), assign("z", "y")]);
        let mut context = AnalysisContext::new(&cfg, owner(), CopySetDomain);
        let result = CopyAnalysis::analyze(&mut context).unwrap();

        let entities = context.entities();
        let x = entities.lookup(EntityKind::Local, "x", None).unwrap();
        let y = entities.lookup(EntityKind::Local, "y", None).unwrap();
        let z = entities.lookup(EntityKind::Local, "z", None).unwrap();

        let entry = cfg.entry();
        // Classes are reported in entity-id order (y was interned before x).
        assert_eq!(result.copies_on_exit(entry, x), vec![y, z]);
        assert_eq!(result.copies_on_exit(entry, y), vec![x, z]);
        assert_eq!(result.copies_on_exit(entry, z), vec![y, x]);
    }

    #[test]
    fn test_overwrite_dissolves_class_membership() {
        let cfg = straight_line(vec![
            assign("y", "x"),
            Operation::assign(Place::local("x"), Expr::int(5)),
        ]);
        let mut context = AnalysisContext::new(&cfg, owner(), CopySetDomain);
        let result = CopyAnalysis::analyze(&mut context).unwrap();

        let entities = context.entities();
        let x = entities.lookup(EntityKind::Local, "x", None).unwrap();
        let y = entities.lookup(EntityKind::Local, "y", None).unwrap();

        let entry = cfg.entry();
        assert!(result.copies_on_exit(entry, x).is_empty());
        assert!(result.copies_on_exit(entry, y).is_empty());
    }

    #[test]
    fn test_join_keeps_only_common_copies() {
        // b0 branches to b1 (y = x) and b2 (y = x; z = x); join at b3.
        let mut builder = ControlFlowGraphBuilder::new();
        let b0 = builder.add_block(Vec::new());
        let b1 = builder.add_block(vec![assign("y", "x")]);
        let b2 = builder.add_block(vec![assign("y", "x"), assign("z", "x")]);
        let b3 = builder.add_block(Vec::new());
        builder.add_edge(b0, b1, CfgEdgeKind::ConditionalTrue).unwrap();
        builder.add_edge(b0, b2, CfgEdgeKind::ConditionalFalse).unwrap();
        builder.add_edge(b1, b3, CfgEdgeKind::Unconditional).unwrap();
        builder.add_edge(b2, b3, CfgEdgeKind::Unconditional).unwrap();
        let cfg = builder.build().unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), CopySetDomain);
        let result = CopyAnalysis::analyze(&mut context).unwrap();

        let entities = context.entities();
        let x = entities.lookup(EntityKind::Local, "x", None).unwrap();
        let y = entities.lookup(EntityKind::Local, "y", None).unwrap();
        let z = entities.lookup(EntityKind::Local, "z", None).unwrap();

        // y = x holds on both paths, z = x only on one.
        assert_eq!(result.copies_on_entry(b3, y), vec![x]);
        assert!(result.copies_on_entry(b3, z).is_empty());
    }

    #[test]
    fn test_self_assignment_is_inert() {
        let cfg = straight_line(vec![assign("y", "x"), assign("x", "x")]);
        let mut context = AnalysisContext::new(&cfg, owner(), CopySetDomain);
        let result = CopyAnalysis::analyze(&mut context).unwrap();

        let entities = context.entities();
        let x = entities.lookup(EntityKind::Local, "x", None).unwrap();
        let y = entities.lookup(EntityKind::Local, "y", None).unwrap();

        // x = x must not dissolve the x/y relation.
        assert_eq!(result.copies_on_exit(cfg.entry(), x), vec![y]);
    }
}
