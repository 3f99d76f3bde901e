//! Value content analysis: literal tracking over entity-value maps.
//!
//! This analysis computes, for every storage location at every block boundary,
//! what is known about the location's *contents*: a specific set of literal
//! values, or the admission that the location may contain something
//! non-literal. It is the canonical client of the fixpoint engine and the
//! reference implementation of the [`AbstractValueDomain`] contract.
//!
//! # The Lattice
//!
//! ```text
//!                 unknown  (may contain non-literal)
//!                /   |   \
//!        {1, 2}   {1, 3}   {"a"}     finite literal sets, ordered by inclusion
//!            \    |    /
//!              {1}  ...
//!                 \ |
//!                bottom  (unreached)
//! ```
//!
//! Merging unions literal sets; the unknown sentinel absorbs, and literal sets
//! that grow beyond an internal bound coarsen to unknown. The back-edge
//! widening rule replaces two structurally different values of the same
//! [`NonLiteralState`] with the sentinel, which is what keeps loops from
//! oscillating between literal sets forever.
//!
//! # Prerequisite Analyses
//!
//! When the context carries a [`CopyAnalysisResult`](crate::dataflow::CopyAnalysisResult),
//! reads of a location at its default fall back to a must-copy alias, and
//! strong updates land on the whole copy class. When it carries a
//! [`PointsToAnalysisResult`](crate::dataflow::PointsToAnalysisResult), writes
//! through a parent reference that may target several locations degrade to
//! weak updates. Both results are consulted read-only; their absence degrades
//! to the conservative default rather than failing.

use std::{cmp::Ordering, collections::BTreeSet, fmt, sync::Arc};

use rayon::prelude::*;

use crate::{
    cfg::{BlockId, ControlFlowGraph},
    dataflow::{
        cache::{AnalysisCacheKey, AnalysisResultCache},
        context::{AnalysisConfig, AnalysisContext},
        data::AnalysisData,
        domain::AbstractValueDomain,
        engine::{DataFlowEngine, OperationVisitor},
        entity::EntityId,
        result::DataFlowAnalysisResult,
    },
    ir::{BinaryOp, Expr, Literal, Operation, OwningSymbol},
    utils::synchronization::CancellationToken,
    Result,
};

/// Upper bound on materialized literal sets.
///
/// Folding and merging can multiply set sizes; a set exceeding this bound
/// coarsens to the unknown sentinel so values stay small and chains stay
/// short.
const MAX_LITERALS: usize = 32;

/// Classification of a value's non-literal content.
///
/// The ordering is the lattice ordering of the classification itself:
/// `Undefined < No < Maybe`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
pub enum NonLiteralState {
    /// No value has reached this location yet.
    Undefined,
    /// The location holds one of the tracked literals, nothing else.
    No,
    /// The location may contain a non-literal value.
    Maybe,
}

/// An element of the value content lattice.
///
/// Invariants: the `Undefined` state implies an empty literal set (the bottom
/// element), the `Maybe` state implies an empty literal set (the absorbing
/// unknown sentinel), and the `No` state implies a non-empty set of at most
/// `MAX_LITERALS` literals. Values are immutable once constructed and always
/// structurally compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueContentValue {
    /// The literal values the location may hold.
    literals: BTreeSet<Literal>,
    /// Whether the location may hold something that is not a tracked literal.
    state: NonLiteralState,
}

impl ValueContentValue {
    /// The bottom element: no value has reached the location.
    #[must_use]
    pub fn bottom() -> Self {
        Self {
            literals: BTreeSet::new(),
            state: NonLiteralState::Undefined,
        }
    }

    /// The top element: the location may contain any value.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            literals: BTreeSet::new(),
            state: NonLiteralState::Maybe,
        }
    }

    /// A single known literal.
    #[must_use]
    pub fn literal(literal: Literal) -> Self {
        Self {
            literals: BTreeSet::from([literal]),
            state: NonLiteralState::No,
        }
    }

    /// A finite set of known literals.
    ///
    /// An empty iterator yields [`bottom`](Self::bottom); a set larger than
    /// the internal bound coarsens to [`unknown`](Self::unknown).
    #[must_use]
    pub fn from_literals(literals: impl IntoIterator<Item = Literal>) -> Self {
        let literals: BTreeSet<Literal> = literals.into_iter().collect();
        if literals.is_empty() {
            return Self::bottom();
        }
        if literals.len() > MAX_LITERALS {
            return Self::unknown();
        }
        Self {
            literals,
            state: NonLiteralState::No,
        }
    }

    /// Returns the tracked literal values.
    #[must_use]
    pub fn literals(&self) -> &BTreeSet<Literal> {
        &self.literals
    }

    /// Returns the non-literal classification of this value.
    #[must_use]
    pub const fn non_literal_state(&self) -> NonLiteralState {
        self.state
    }

    /// Returns `true` if this is the bottom element.
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.state == NonLiteralState::Undefined
    }

    /// Returns `true` if this is the absorbing unknown sentinel.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.state == NonLiteralState::Maybe
    }

    /// Returns `true` if the location holds one of finitely many literals.
    #[must_use]
    pub fn is_literal_only(&self) -> bool {
        self.state == NonLiteralState::No
    }
}

impl fmt::Display for ValueContentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            NonLiteralState::Undefined => write!(f, "undefined"),
            NonLiteralState::Maybe => write!(f, "unknown"),
            NonLiteralState::No => {
                write!(f, "{{")?;
                for (index, literal) in self.literals.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{literal}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// The value content lattice as an [`AbstractValueDomain`].
///
/// The domain is a stateless singleton: one instance may serve any number of
/// concurrent runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueContentDomain;

impl AbstractValueDomain for ValueContentDomain {
    type Value = ValueContentValue;

    fn bottom(&self) -> Self::Value {
        ValueContentValue::bottom()
    }

    fn unknown(&self) -> Self::Value {
        ValueContentValue::unknown()
    }

    fn merge(&self, lhs: &Self::Value, rhs: &Self::Value) -> Self::Value {
        if lhs.is_unknown() || rhs.is_unknown() {
            return ValueContentValue::unknown();
        }
        if lhs.is_bottom() {
            return rhs.clone();
        }
        if rhs.is_bottom() {
            return lhs.clone();
        }
        ValueContentValue::from_literals(lhs.literals.iter().chain(rhs.literals.iter()).cloned())
    }

    fn compare(&self, lhs: &Self::Value, rhs: &Self::Value) -> Option<Ordering> {
        if lhs == rhs {
            return Some(Ordering::Equal);
        }
        if lhs.is_bottom() {
            return Some(Ordering::Less);
        }
        if rhs.is_bottom() {
            return Some(Ordering::Greater);
        }
        if rhs.is_unknown() {
            return Some(Ordering::Less);
        }
        if lhs.is_unknown() {
            return Some(Ordering::Greater);
        }
        // Both are unequal literal sets; inclusion decides.
        if lhs.literals.is_subset(&rhs.literals) {
            return Some(Ordering::Less);
        }
        if rhs.literals.is_subset(&lhs.literals) {
            return Some(Ordering::Greater);
        }
        None
    }

    fn widen_on_back_edge(
        &self,
        forward: &Self::Value,
        back: &Self::Value,
    ) -> Option<Self::Value> {
        // Two structurally different values of the same classification would
        // oscillate between loop iterations; replace them with the sentinel.
        if forward != back && forward.state == back.state {
            return Some(ValueContentValue::unknown());
        }
        None
    }
}

/// The value content analysis over the bundled statement IR.
///
/// The struct itself is only a namespace for the entry points; the actual
/// transfer function lives in [`ValueContentVisitor`].
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
///
/// # fn run() -> flowscope::Result<()> {
/// let mut builder = ControlFlowGraphBuilder::new();
/// builder.add_block(vec![Operation::assign(Place::local("x"), Expr::int(7))]);
/// let cfg = builder.build()?;
///
/// let owner = OwningSymbol::new(SymbolId::new(1), "Sample::Method");
/// let mut context = AnalysisContext::new(&cfg, owner, ValueContentDomain);
/// let result = ValueContentAnalysis::analyze(&mut context)?;
///
/// let x = context.entities().lookup(EntityKind::Local, "x", None).unwrap();
/// let value = result.block(cfg.entry()).unwrap().output_value(x).unwrap();
/// assert!(value.is_literal_only());
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct ValueContentAnalysis;

impl ValueContentAnalysis {
    /// Runs the analysis over the context's graph to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`](crate::Error::Cancelled) when the
    /// context's cancellation token is signalled mid-run.
    pub fn analyze(
        context: &mut AnalysisContext<'_, Operation, ValueContentDomain>,
    ) -> Result<DataFlowAnalysisResult<ValueContentValue>> {
        let mut engine = DataFlowEngine::new();
        let mut visitor = ValueContentVisitor::default();
        engine.run(context, &mut visitor)
    }

    /// Runs the analysis through the memoized result cache.
    ///
    /// The cache key is derived from the context's owning symbol and the
    /// graph version, so repeated requests for the same function within a
    /// compilation pass hit the cache instead of recomputing.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Cancelled`](crate::Error::Cancelled) from the
    /// underlying run; cancelled runs are never cached.
    pub fn analyze_cached(
        cache: &AnalysisResultCache<ValueContentValue>,
        context: &mut AnalysisContext<'_, Operation, ValueContentDomain>,
    ) -> Result<Arc<DataFlowAnalysisResult<ValueContentValue>>> {
        let key = AnalysisCacheKey::new(context.owner().id(), context.cfg().version());
        cache.get_or_compute(key, || Self::analyze(context))
    }

    /// Analyzes many independent functions in parallel.
    ///
    /// Each function gets its own context, entity set, and engine; nothing
    /// mutable is shared between runs, so the batch parallelizes freely. The
    /// shared cancellation token aborts the whole batch.
    ///
    /// # Errors
    ///
    /// Returns the first error any run produced, typically
    /// [`Error::Cancelled`](crate::Error::Cancelled).
    pub fn analyze_all(
        functions: &[(OwningSymbol, &ControlFlowGraph<Operation>)],
        config: AnalysisConfig,
        cancellation: &CancellationToken,
    ) -> Result<Vec<DataFlowAnalysisResult<ValueContentValue>>> {
        functions
            .par_iter()
            .map(|(owner, cfg)| {
                let mut context = AnalysisContext::new(*cfg, owner.clone(), ValueContentDomain)
                    .with_config(config)
                    .with_cancellation(cancellation.clone());
                Self::analyze(&mut context)
            })
            .collect()
    }
}

/// Transfer function of the value content analysis.
///
/// The visitor is stateful: it tracks which entities the current block has
/// already written, because block-entry copy relations only remain valid for
/// locations the block has not touched yet.
#[derive(Debug, Default)]
pub struct ValueContentVisitor {
    /// Entities written (or clobbered) since the current block started.
    written: std::collections::HashSet<EntityId>,
}

impl ValueContentVisitor {
    /// Returns `true` when `entity`'s block-entry copy relations still hold.
    fn entry_copies_valid(&self, entity: EntityId) -> bool {
        !self.written.contains(&entity)
    }

    /// Evaluates an expression against the current state.
    fn evaluate(
        &self,
        block: BlockId,
        expr: &Expr,
        state: &AnalysisData<ValueContentValue>,
        context: &mut AnalysisContext<'_, Operation, ValueContentDomain>,
    ) -> ValueContentValue {
        match expr {
            Expr::Literal(literal) => ValueContentValue::literal(literal.clone()),
            Expr::Read(place) => {
                let entity = context.intern_place(place);
                if let Some(value) = state.get(entity) {
                    return value.clone();
                }
                // The entity itself is at the default; a must-copy alias may
                // still carry a more precise value, provided the relation has
                // not been dissolved by a write earlier in this block.
                if self.entry_copies_valid(entity) {
                    if let Some(copies) = context.copy_result() {
                        for alias in copies.copies_on_entry(block, entity) {
                            if !self.entry_copies_valid(alias) {
                                continue;
                            }
                            if let Some(value) = state.get(alias) {
                                return value.clone();
                            }
                        }
                    }
                }
                context.data_domain().default_value(entity)
            }
            Expr::Binary { op, lhs, rhs } => {
                let left = self.evaluate(block, lhs, state, context);
                let right = self.evaluate(block, rhs, state, context);
                Self::fold_binary(*op, &left, &right)
            }
            Expr::Call { .. } => {
                if context.config().is_pessimistic() {
                    ValueContentValue::unknown()
                } else {
                    // Optimistic runs let the fixpoint refine call results.
                    ValueContentValue::bottom()
                }
            }
        }
    }

    /// Folds a binary operation over two abstract values.
    fn fold_binary(
        op: BinaryOp,
        lhs: &ValueContentValue,
        rhs: &ValueContentValue,
    ) -> ValueContentValue {
        if lhs.is_bottom() || rhs.is_bottom() {
            return ValueContentValue::bottom();
        }
        if !lhs.is_literal_only() || !rhs.is_literal_only() {
            return ValueContentValue::unknown();
        }
        let mut folded = BTreeSet::new();
        for left in lhs.literals() {
            for right in rhs.literals() {
                match Self::fold_literals(op, left, right) {
                    Some(result) => {
                        folded.insert(result);
                    }
                    None => return ValueContentValue::unknown(),
                }
            }
        }
        ValueContentValue::from_literals(folded)
    }

    /// Folds one literal pairing; `None` marks an unfoldable combination.
    fn fold_literals(op: BinaryOp, lhs: &Literal, rhs: &Literal) -> Option<Literal> {
        match (op, lhs, rhs) {
            (BinaryOp::Add, Literal::Int(a), Literal::Int(b)) => {
                a.checked_add(*b).map(Literal::Int)
            }
            (BinaryOp::Sub, Literal::Int(a), Literal::Int(b)) => {
                a.checked_sub(*b).map(Literal::Int)
            }
            (BinaryOp::Mul, Literal::Int(a), Literal::Int(b)) => {
                a.checked_mul(*b).map(Literal::Int)
            }
            (BinaryOp::Add, Literal::Str(a), Literal::Str(b)) => {
                Some(Literal::Str(format!("{a}{b}")))
            }
            _ => None,
        }
    }

    /// Writes a value to an entity, deciding between strong and weak update.
    ///
    /// `refinements` are entities known to must-equal the written value (the
    /// assignment source and its still-valid copy class); a strong update
    /// refines their recorded values as well.
    fn write(
        target: EntityId,
        refinements: &[EntityId],
        value: ValueContentValue,
        state: &mut AnalysisData<ValueContentValue>,
        context: &AnalysisContext<'_, Operation, ValueContentDomain>,
    ) {
        // A write through a parent reference that may target several
        // locations cannot overwrite: it merges with what was there.
        let weak = match context.entities().get(target).and_then(|e| e.parent()) {
            Some(parent) => context
                .points_to_result()
                .is_some_and(|points_to| points_to.may_alias_many(parent)),
            None => false,
        };

        let resolved = if weak {
            let current = context.data_domain().value_or_default(state, target);
            context.value_domain().merge(&current, &value)
        } else {
            value
        };

        let mut targets = vec![target];
        if !weak {
            targets.extend_from_slice(refinements);
        }
        for entity in targets {
            if context.data_domain().can_skip_new_entry(entity, &resolved) {
                state.remove(entity);
            } else {
                state.set(entity, resolved.clone());
            }
        }
    }
}

impl OperationVisitor<Operation> for ValueContentVisitor {
    type Domain = ValueContentDomain;

    fn visit_block_start(&mut self, _block: BlockId) {
        self.written.clear();
    }

    fn visit_operation(
        &mut self,
        block: BlockId,
        operation: &Operation,
        mut state: AnalysisData<ValueContentValue>,
        context: &mut AnalysisContext<'_, Operation, ValueContentDomain>,
    ) -> AnalysisData<ValueContentValue> {
        match operation {
            Operation::Assign { target, value } => {
                let resolved = self.evaluate(block, value, &state, context);
                let entity = context.intern_place(target);

                // After `target = source`, the source and its still-valid copy
                // class must equal the written value; refine them alongside.
                let mut refinements = Vec::new();
                if let Expr::Read(source) = value {
                    let source_id = context.intern_place(source);
                    if source_id != entity && self.entry_copies_valid(source_id) {
                        refinements.push(source_id);
                        if let Some(copies) = context.copy_result() {
                            refinements.extend(
                                copies
                                    .copies_on_entry(block, source_id)
                                    .into_iter()
                                    .filter(|alias| {
                                        *alias != entity && self.entry_copies_valid(*alias)
                                    }),
                            );
                        }
                    }
                }

                Self::write(entity, &refinements, resolved, &mut state, context);
                self.written.insert(entity);
            }
            Operation::Call { callee } => {
                if context.config().is_pessimistic() {
                    // An opaque callee may write any heap-reached location.
                    log::trace!(
                        target: "value-content",
                        "call to {callee} clobbers heap-reached state"
                    );
                    let clobbered: Vec<EntityId> = context.entities().heap_reached().collect();
                    for entity in clobbered {
                        state.remove(entity);
                        self.written.insert(entity);
                    }
                }
            }
        }
        state
    }
}
