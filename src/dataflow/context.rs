//! Per-run analysis execution context.
//!
//! An [`AnalysisContext`] bundles everything one fixpoint run over one control
//! flow graph needs: the graph itself (read-only, externally owned), the
//! owning symbol, the value domain lifted into a map domain, the entity
//! interner, optional results of prerequisite analyses, the conservatism
//! configuration, and the cancellation signal.
//!
//! Contexts are exclusive to one run; nothing in a context is shared mutably
//! across runs, which is what makes independent analyses over different
//! graphs safe to execute concurrently.

use std::sync::Arc;

use crate::{
    cfg::ControlFlowGraph,
    dataflow::{
        copy::CopyAnalysisResult, data::AnalysisDataDomain, domain::AbstractValueDomain,
        entity::EntityInterner, points_to::PointsToAnalysisResult,
    },
    ir::OwningSymbol,
    utils::synchronization::CancellationToken,
};

/// Conservatism configuration for an analysis run.
///
/// Pessimistic runs assume the worst about everything the analysis cannot
/// see: opaque calls produce unknown values and may mutate any heap-reached
/// location. Optimistic runs assume non-interference and let the fixpoint
/// refine call results from `bottom`, which is only sound when a caller
/// separately validates those assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Whether unanalyzable constructs are treated conservatively.
    pessimistic: bool,
}

impl AnalysisConfig {
    /// Creates the conservative configuration (the default).
    #[must_use]
    pub const fn pessimistic() -> Self {
        Self { pessimistic: true }
    }

    /// Creates the optimistic configuration.
    #[must_use]
    pub const fn optimistic() -> Self {
        Self { pessimistic: false }
    }

    /// Returns `true` when unanalyzable constructs are treated conservatively.
    #[must_use]
    pub const fn is_pessimistic(&self) -> bool {
        self.pessimistic
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::pessimistic()
    }
}

/// Execution context for a single analysis run over a single graph.
///
/// Create one with [`new`](Self::new), optionally chain the `with_*` builders
/// to supply prerequisite results, configuration and cancellation, then hand
/// it to [`DataFlowEngine::run`](crate::dataflow::DataFlowEngine::run) or one
/// of the bundled analyses' entry points.
///
/// # Examples
///
/// ```rust
/// use flowscope::prelude::*;
///
/// # fn build() -> flowscope::Result<()> {
/// let mut builder = ControlFlowGraphBuilder::new();
/// builder.add_block(vec![Operation::assign(Place::local("x"), Expr::int(1))]);
/// let cfg = builder.build()?;
///
/// let owner = OwningSymbol::new(SymbolId::new(1), "Sample::Method");
/// let context = AnalysisContext::new(&cfg, owner, ValueContentDomain)
///     .with_config(AnalysisConfig::optimistic());
/// assert!(!context.config().is_pessimistic());
/// # Ok(())
/// # }
/// # build().unwrap();
/// ```
pub struct AnalysisContext<'cfg, Op, D: AbstractValueDomain> {
    /// The graph under analysis.
    cfg: &'cfg ControlFlowGraph<Op>,
    /// The symbol owning the graph.
    owner: OwningSymbol,
    /// The value domain lifted over entity-value maps.
    data_domain: AnalysisDataDomain<D>,
    /// The entity interner owned by this run.
    entities: EntityInterner,
    /// Copy analysis result, when a prerequisite run produced one.
    copy_result: Option<Arc<CopyAnalysisResult>>,
    /// Points-to analysis result, when supplied by the caller.
    points_to_result: Option<Arc<PointsToAnalysisResult>>,
    /// Conservatism configuration.
    config: AnalysisConfig,
    /// Cooperative cancellation signal.
    cancellation: CancellationToken,
}

impl<'cfg, Op, D: AbstractValueDomain> AnalysisContext<'cfg, Op, D> {
    /// Creates a context for one run of the given domain over `cfg`.
    #[must_use]
    pub fn new(cfg: &'cfg ControlFlowGraph<Op>, owner: OwningSymbol, value_domain: D) -> Self {
        Self {
            cfg,
            owner,
            data_domain: AnalysisDataDomain::new(value_domain),
            entities: EntityInterner::new(),
            copy_result: None,
            points_to_result: None,
            config: AnalysisConfig::default(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Replaces the conservatism configuration.
    #[must_use]
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a cancellation token observed between block visits.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attaches the result of a prerequisite copy analysis.
    #[must_use]
    pub fn with_copy_result(mut self, result: Arc<CopyAnalysisResult>) -> Self {
        self.copy_result = Some(result);
        self
    }

    /// Attaches the result of a prerequisite points-to analysis.
    #[must_use]
    pub fn with_points_to_result(mut self, result: Arc<PointsToAnalysisResult>) -> Self {
        self.points_to_result = Some(result);
        self
    }

    /// Seeds this context with an interner from an earlier run.
    ///
    /// A pipeline of analyses over the same graph must agree on entity ids
    /// for one run's result to be consultable by the next; handing the
    /// interner from context to context guarantees that.
    #[must_use]
    pub fn with_entities(mut self, entities: EntityInterner) -> Self {
        self.entities = entities;
        self
    }

    /// Returns the graph under analysis.
    ///
    /// The returned reference carries the graph's own lifetime, not the
    /// context borrow, so it can be held across mutations of the context.
    #[must_use]
    pub fn cfg(&self) -> &'cfg ControlFlowGraph<Op> {
        self.cfg
    }

    /// Returns the symbol owning the graph.
    #[must_use]
    pub fn owner(&self) -> &OwningSymbol {
        &self.owner
    }

    /// Returns the lifted map domain for this run.
    #[must_use]
    pub fn data_domain(&self) -> &AnalysisDataDomain<D> {
        &self.data_domain
    }

    /// Returns the underlying value domain.
    #[must_use]
    pub fn value_domain(&self) -> &D {
        self.data_domain.value_domain()
    }

    /// Returns the entity interner.
    #[must_use]
    pub fn entities(&self) -> &EntityInterner {
        &self.entities
    }

    /// Returns the entity interner for interning new locations.
    pub fn entities_mut(&mut self) -> &mut EntityInterner {
        &mut self.entities
    }

    /// Consumes the context, yielding its interner for a follow-up run.
    #[must_use]
    pub fn into_entities(self) -> EntityInterner {
        self.entities
    }

    /// Interns a syntactic place and its parent chain, returning the entity id.
    ///
    /// Repeated calls with places denoting the same storage location yield the
    /// same id; this is how visitors bring entities into existence.
    pub fn intern_place(&mut self, place: &crate::ir::Place) -> crate::dataflow::EntityId {
        let parent = place.parent().map(|parent| self.intern_place(parent));
        self.entities.intern(place.kind(), place.name(), parent)
    }

    /// Returns the prerequisite copy analysis result, if attached.
    #[must_use]
    pub fn copy_result(&self) -> Option<&CopyAnalysisResult> {
        self.copy_result.as_deref()
    }

    /// Returns the prerequisite points-to analysis result, if attached.
    #[must_use]
    pub fn points_to_result(&self) -> Option<&PointsToAnalysisResult> {
        self.points_to_result.as_deref()
    }

    /// Returns the conservatism configuration.
    #[must_use]
    pub const fn config(&self) -> AnalysisConfig {
        self.config
    }

    /// Returns the cancellation token observed by the engine.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cfg::ControlFlowGraphBuilder,
        dataflow::{EntityKind, ValueContentDomain},
        ir::{Operation, SymbolId},
    };

    fn sample_cfg() -> ControlFlowGraph<Operation> {
        let mut builder = ControlFlowGraphBuilder::new();
        builder.add_block(Vec::new());
        builder.build().unwrap()
    }

    #[test]
    fn test_default_config_is_pessimistic() {
        let cfg = sample_cfg();
        let context = AnalysisContext::new(
            &cfg,
            OwningSymbol::new(SymbolId::new(1), "m"),
            ValueContentDomain,
        );
        assert!(context.config().is_pessimistic());
        assert!(context.copy_result().is_none());
        assert!(context.points_to_result().is_none());
        assert!(!context.cancellation().is_cancelled());
    }

    #[test]
    fn test_interner_hand_off_preserves_ids() {
        let cfg = sample_cfg();
        let mut first = AnalysisContext::new(
            &cfg,
            OwningSymbol::new(SymbolId::new(1), "m"),
            ValueContentDomain,
        );
        let x = first.entities_mut().intern(EntityKind::Local, "x", None);

        let second = AnalysisContext::new(
            &cfg,
            OwningSymbol::new(SymbolId::new(1), "m"),
            ValueContentDomain,
        )
        .with_entities(first.into_entities());

        assert_eq!(second.entities().lookup(EntityKind::Local, "x", None), Some(x));
    }
}
